//! List view glue: request parameters in, narrowed collection and filter context out.
//!
//! ```ignore
//! async fn list_items(State(app): State<Arc<App>>, FullPath(full_path): FullPath) -> Result<Json<Page>, FilterError> {
//!     let messages = Messages::new();
//!     let listed = app.view.filter_collection(&full_path, &app.catalog, &messages)?;
//!     let filters = app.view.context(&full_path, &listed.resolution);
//!     Ok(Json(Page { items: listed.collection.rows().to_vec(), filters }))
//! }
//! ```

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use crate::collection::{ModelCatalog, WarningSink};
use crate::errors::FilterError;
use crate::filters::{FilterEnv, FilterRegistry, ListFilter};
use crate::lookup::LookupParams;
use crate::models::{FilterContext, FilterEntry};
use crate::query_string::QueryString;
use crate::resolution::{self, Declaration, Resolution};
use crate::settings::FilterSettings;

/// A list view's filter declarations and the configuration they run under.
pub struct ListView<M: ModelCatalog> {
    model: String,
    declarations: Vec<Declaration<M>>,
    settings: Arc<FilterSettings>,
    registry: Arc<FilterRegistry>,
}

impl<M: ModelCatalog> ListView<M> {
    /// A view over `model` with default settings and the default registry
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            declarations: Vec::new(),
            settings: Arc::new(FilterSettings::default()),
            registry: Arc::new(FilterRegistry::default()),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Arc<FilterSettings>) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<FilterRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Append a declaration. Declaration order is resolution order.
    #[must_use]
    pub fn filter(mut self, declaration: Declaration<M>) -> Self {
        self.declarations.push(declaration);
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn declarations(&self) -> &[Declaration<M>] {
        &self.declarations
    }

    #[must_use]
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Request arguments without the pagination and error keys. A repeated key
    /// keeps its first value.
    #[must_use]
    pub fn filter_params(&self, query: &QueryString) -> LookupParams {
        let mut params = LookupParams::new();
        for (key, value) in query.args() {
            if *key == self.settings.page_var || *key == self.settings.error_var {
                continue;
            }
            params.entry(key.clone()).or_insert_with(|| value.clone());
        }
        params
    }

    /// Build this request's filters.
    ///
    /// # Errors
    ///
    /// Fails on the first misconfigured declaration.
    pub fn resolve(
        &self,
        query: &QueryString,
        catalog: &M,
        warnings: &dyn WarningSink,
    ) -> Result<Resolution, FilterError> {
        let env = FilterEnv {
            catalog,
            model: &self.model,
            settings: &self.settings,
            warnings,
        };
        resolution::resolve(&self.declarations, &self.filter_params(query), &env, &self.registry)
    }

    /// Resolve the filters for `full_path` and narrow the model's rows with them.
    ///
    /// # Errors
    ///
    /// Configuration errors, invalid lookups, and data-source failures while
    /// loading the unfiltered rows.
    pub fn filter_collection(
        &self,
        full_path: &str,
        catalog: &M,
        warnings: &dyn WarningSink,
    ) -> Result<FilteredList<M::Collection>, FilterError> {
        let query = QueryString::parse(full_path);
        let resolution = self.resolve(&query, catalog, warnings)?;
        let collection = resolution.apply(catalog.objects(&self.model)?)?;
        tracing::debug!(
            model = %self.model,
            filters = resolution.filters.len(),
            active = resolution.has_active_filters,
            "Filtered list view"
        );
        Ok(FilteredList {
            collection,
            resolution,
        })
    }

    /// Template data for the filters of a resolved request.
    #[must_use]
    pub fn context(&self, full_path: &str, resolution: &Resolution) -> FilterContext {
        let query = QueryString::parse(full_path);
        let filter_list = resolution
            .filters
            .iter()
            .map(|filter| FilterEntry {
                title: filter.title().to_string(),
                choices: filter.choices(&query),
                clear_url: filter.clear_filter_string(&query),
            })
            .collect();
        FilterContext {
            non_page_args: query.non_page_args(&self.settings.page_var),
            filter_list,
            clear_filter_fragment: query.clear_all(&self.settings.page_var),
        }
    }
}

impl<M: ModelCatalog> Clone for ListView<M> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            declarations: self.declarations.clone(),
            settings: Arc::clone(&self.settings),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<M: ModelCatalog> fmt::Debug for ListView<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListView")
            .field("model", &self.model)
            .field("declarations", &self.declarations)
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .finish()
    }
}

/// A narrowed collection together with the filters that narrowed it.
#[derive(Debug)]
pub struct FilteredList<C> {
    pub collection: C,
    pub resolution: Resolution,
}

impl<C> FilteredList<C> {
    /// The kept filter declared on `field_path`
    #[must_use]
    pub fn filter_by_name(&self, field_path: &str) -> Option<&dyn ListFilter> {
        self.resolution.filter_by_name(field_path)
    }
}

/// The request's path and query string, as the filters build links from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullPath(pub String);

impl<S: Send + Sync> FromRequestParts<S> for FullPath {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let full_path = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |path_and_query| path_and_query.as_str().to_string());
        Ok(Self(full_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalog;
    use axum::http::Request;

    #[test]
    fn test_filter_params_drops_page_and_error() {
        let view: ListView<MemoryCatalog> = ListView::new("Item");
        let query = QueryString::parse("/items/?page=2&e=1&size=L&size=S&q=lamp");
        let params = view.filter_params(&query);
        assert_eq!(params.get("size").map(String::as_str), Some("L"));
        // search is stripped later, with the other ignored parameters
        assert!(params.contains_key("q"));
        assert!(!params.contains_key("page"));
        assert!(!params.contains_key("e"));
    }

    #[test]
    fn test_custom_page_var() {
        let settings = FilterSettings {
            page_var: "p".to_string(),
            ..FilterSettings::default()
        };
        let view: ListView<MemoryCatalog> = ListView::new("Item").with_settings(Arc::new(settings));
        let params = view.filter_params(&QueryString::parse("/items/?p=2&page=3"));
        assert!(!params.contains_key("p"));
        assert_eq!(params.get("page").map(String::as_str), Some("3"));
    }

    #[tokio::test]
    async fn test_full_path_extractor() {
        let (mut parts, ()) = Request::builder()
            .uri("/items/?color__exact=red&page=2")
            .body(())
            .unwrap()
            .into_parts();
        let FullPath(full_path) = FullPath::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(full_path, "/items/?color__exact=red&page=2");
    }

    #[tokio::test]
    async fn test_full_path_without_query() {
        let (mut parts, ()) = Request::builder().uri("/items/").body(()).unwrap().into_parts();
        let FullPath(full_path) = FullPath::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(full_path, "/items/");
    }
}
