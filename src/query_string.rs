//! Parsed request path plus query string, with pure edit operations.
//!
//! Every operation returns a new [`QueryString`]; the request's own path is never
//! modified. Argument order is preserved so generated links stay stable.

use std::fmt;
use url::form_urlencoded;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryString {
    path: String,
    args: Vec<(String, String)>,
}

impl QueryString {
    /// Parse a request's full path (`/items/?color=red`). Any fragment is dropped.
    #[must_use]
    pub fn parse(full_path: &str) -> Self {
        let without_fragment = full_path.split_once('#').map_or(full_path, |(head, _)| head);
        let (path, query) = without_fragment
            .split_once('?')
            .unwrap_or((without_fragment, ""));
        let args = form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Self {
            path: path.to_string(),
            args,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn args(&self) -> &[(String, String)] {
        &self.args
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.args.iter().any(|(k, _)| k == key)
    }

    /// First value of `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Argument names, one per distinct key, in first-seen order
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (key, _) in &self.args {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }

    /// Drop every argument whose key starts with one of `prefixes`.
    #[must_use]
    pub fn remove<S: AsRef<str>>(&self, prefixes: &[S]) -> Self {
        self.retain(|key| !prefixes.iter().any(|prefix| key.starts_with(prefix.as_ref())))
    }

    /// Drop every argument whose key equals one of `keys`.
    #[must_use]
    pub fn remove_exact<S: AsRef<str>>(&self, keys: &[S]) -> Self {
        self.retain(|key| !keys.iter().any(|k| k.as_ref() == key))
    }

    /// Set `key` to `value`, or delete it when `value` is `None`.
    ///
    /// An existing key keeps its position; duplicates of it are dropped.
    #[must_use]
    pub fn set(&self, key: &str, value: Option<&str>) -> Self {
        let Some(value) = value else {
            return self.remove_exact(&[key]);
        };
        let mut args = Vec::with_capacity(self.args.len() + 1);
        let mut replaced = false;
        for (k, v) in &self.args {
            if k == key {
                if !replaced {
                    args.push((k.clone(), value.to_string()));
                    replaced = true;
                }
            } else {
                args.push((k.clone(), v.clone()));
            }
        }
        if !replaced {
            args.push((key.to_string(), value.to_string()));
        }
        Self {
            path: self.path.clone(),
            args,
        }
    }

    /// Remove `remove` prefixes first, then apply each `(key, value)` in order.
    #[must_use]
    pub fn with_changes<S: AsRef<str>>(&self, new_params: &[(&str, Option<&str>)], remove: &[S]) -> Self {
        new_params
            .iter()
            .fold(self.remove(remove), |query, (key, value)| query.set(key, *value))
    }

    /// Path without any query, offered only when a non-pagination argument exists.
    #[must_use]
    pub fn clear_all(&self, page_var: &str) -> Option<String> {
        let keys = self.keys();
        if keys.is_empty() || (keys.len() == 1 && keys[0] == page_var) {
            None
        } else {
            Some(self.path.clone())
        }
    }

    /// Argument names other than the pagination key
    #[must_use]
    pub fn non_page_args(&self, page_var: &str) -> Vec<String> {
        self.keys()
            .into_iter()
            .filter(|key| *key != page_var)
            .map(str::to_string)
            .collect()
    }

    /// Encoded query without the leading `?`
    #[must_use]
    pub fn query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.args.iter())
            .finish()
    }

    /// Path plus encoded query
    #[must_use]
    pub fn url(&self) -> String {
        if self.args.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query())
        }
    }

    fn retain(&self, keep: impl Fn(&str) -> bool) -> Self {
        Self {
            path: self.path.clone(),
            args: self
                .args
                .iter()
                .filter(|(key, _)| keep(key))
                .cloned()
                .collect(),
        }
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_url() {
        let query = QueryString::parse("/items/?color__exact=red&page=2");
        assert_eq!(query.path(), "/items/");
        assert_eq!(query.get("color__exact"), Some("red"));
        assert_eq!(query.url(), "/items/?color__exact=red&page=2");
    }

    #[test]
    fn test_parse_decodes_values() {
        let query = QueryString::parse("/items/?name=blue%20lamp&q=a+b#top");
        assert_eq!(query.get("name"), Some("blue lamp"));
        assert_eq!(query.get("q"), Some("a b"));
        assert_eq!(query.url(), "/items/?name=blue+lamp&q=a+b");
    }

    #[test]
    fn test_remove_is_prefix_based() {
        let query = QueryString::parse("/items/?color__exact=red&color__isnull=True&size=L");
        assert_eq!(query.remove(&["color"]).url(), "/items/?size=L");
        assert_eq!(query.remove_exact(&["color"]).url(), query.url());
    }

    #[test]
    fn test_set_replaces_in_place() {
        let query = QueryString::parse("/items/?a=1&b=2&a=3");
        assert_eq!(query.set("a", Some("9")).url(), "/items/?a=9&b=2");
        assert_eq!(query.set("c", Some("4")).url(), "/items/?a=1&b=2&a=3&c=4");
        assert_eq!(query.set("a", None).url(), "/items/?b=2");
        assert_eq!(query.set("missing", None), query);
    }

    #[test]
    fn test_with_changes() {
        let query = QueryString::parse("/items/?status__isnull=True&page=3");
        let changed = query.with_changes(&[("status__exact", Some("open"))], &["status__isnull"]);
        assert_eq!(changed.url(), "/items/?page=3&status__exact=open");
        // the source is untouched
        assert_eq!(query.url(), "/items/?status__isnull=True&page=3");
    }

    #[test]
    fn test_clear_all() {
        assert_eq!(QueryString::parse("/items/").clear_all("page"), None);
        assert_eq!(QueryString::parse("/items/?page=3").clear_all("page"), None);
        assert_eq!(
            QueryString::parse("/items/?page=3&color=red").clear_all("page"),
            Some("/items/".to_string())
        );
    }

    #[test]
    fn test_non_page_args() {
        let query = QueryString::parse("/items/?page=3&color=red&q=lamp");
        assert_eq!(query.non_page_args("page"), vec!["color", "q"]);
    }

    #[test]
    fn test_non_page_args_lists_repeated_key_once() {
        let query = QueryString::parse("/items/?size=S&page=2&size=L&color=red");
        assert_eq!(query.non_page_args("page"), vec!["size", "color"]);
    }
}
