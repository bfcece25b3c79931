//! Process-wide configuration for list filters.
//!
//! [`Settings`] is a table of named values, usually loaded once at startup from a
//! JSON document. [`FilterSettings`] is the typed view the filters read, resolved
//! from that table with every option falling back to a documented default:
//!
//! | Setting (prefixed)       | Default    |
//! |--------------------------|------------|
//! | `SHOW_ALL`               | unset      |
//! | `SHOW_UNUSED_FILTERS`    | unset      |
//! | `ALL_VAR`                | `all`      |
//! | `PAGE_VAR`               | `page`     |
//! | `SEARCH_VAR`             | `q`        |
//! | `ERROR_VAR`              | `e`        |
//! | `ORDER_VAR`              | `o`        |
//! | `EXTRA_IGNORED_PARAMS`   | `[]`       |
//! | `EMPTY_VALUE_DISPLAY`    | `--`       |
//!
//! The prefix defaults to [`FILTER_PREFIX`].

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;

/// Namespace prepended to every filter setting name
pub const FILTER_PREFIX: &str = "LISTVIEW_FILTERS_";

pub const ALL_VAR: &str = "all";
pub const PAGE_VAR: &str = "page";
pub const SEARCH_VAR: &str = "q";
pub const ERROR_VAR: &str = "e";
pub const ORDER_VAR: &str = "o";
pub const EMPTY_VALUE_DISPLAY: &str = "--";

/// Named configuration values shared by every request.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, serde_json::Value>,
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a JSON object mapping names to values.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `json` is not a JSON object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let values = serde_json::from_str(json)?;
        Ok(Self { values })
    }

    /// Builder-style override of a single setting
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Return setting `name`, or `default` when it is absent.
    ///
    /// A value of the wrong shape is treated like an absent one.
    pub fn get_setting<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        match self.values.get(name) {
            Some(value) => match T::deserialize(value) {
                Ok(resolved) => resolved,
                Err(err) => {
                    tracing::warn!(setting = name, error = %err, "Ignoring malformed setting");
                    default
                }
            },
            None => default,
        }
    }
}

/// Typed filter configuration handed to views at setup time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Process-wide "All" choice toggle. Overrides per-declaration defaults when set.
    pub show_all: Option<bool>,
    /// Process-wide toggle for listing choices with no matching rows.
    pub show_unused_filters: Option<bool>,
    pub all_var: String,
    pub page_var: String,
    pub search_var: String,
    pub error_var: String,
    pub order_var: String,
    /// Additional query-string keys that never reach the filters
    pub extra_ignored_params: Vec<String>,
    /// Label of the "no value" choice
    pub empty_value_display: String,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            show_all: None,
            show_unused_filters: None,
            all_var: ALL_VAR.to_string(),
            page_var: PAGE_VAR.to_string(),
            search_var: SEARCH_VAR.to_string(),
            error_var: ERROR_VAR.to_string(),
            order_var: ORDER_VAR.to_string(),
            extra_ignored_params: Vec::new(),
            empty_value_display: EMPTY_VALUE_DISPLAY.to_string(),
        }
    }
}

impl FilterSettings {
    /// Resolve every option from `settings` under [`FILTER_PREFIX`].
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::from_settings_with_prefix(settings, FILTER_PREFIX)
    }

    #[must_use]
    pub fn from_settings_with_prefix(settings: &Settings, prefix: &str) -> Self {
        let defaults = Self::default();
        let name = |option: &str| format!("{prefix}{option}");
        Self {
            show_all: settings.get_setting(&name("SHOW_ALL"), defaults.show_all),
            show_unused_filters: settings
                .get_setting(&name("SHOW_UNUSED_FILTERS"), defaults.show_unused_filters),
            all_var: settings.get_setting(&name("ALL_VAR"), defaults.all_var),
            page_var: settings.get_setting(&name("PAGE_VAR"), defaults.page_var),
            search_var: settings.get_setting(&name("SEARCH_VAR"), defaults.search_var),
            error_var: settings.get_setting(&name("ERROR_VAR"), defaults.error_var),
            order_var: settings.get_setting(&name("ORDER_VAR"), defaults.order_var),
            extra_ignored_params: settings
                .get_setting(&name("EXTRA_IGNORED_PARAMS"), defaults.extra_ignored_params),
            empty_value_display: settings
                .get_setting(&name("EMPTY_VALUE_DISPLAY"), defaults.empty_value_display),
        }
    }

    /// Keys excluded from filter consideration: the base variables plus any extras.
    #[must_use]
    pub fn ignored_params(&self) -> Vec<String> {
        let mut ignored = vec![
            self.all_var.clone(),
            self.page_var.clone(),
            self.search_var.clone(),
            self.error_var.clone(),
            self.order_var.clone(),
        ];
        for extra in &self.extra_ignored_params {
            if !ignored.contains(extra) {
                ignored.push(extra.clone());
            }
        }
        ignored
    }

    /// Effective "All" toggle given a declaration's own default
    #[must_use]
    pub fn show_all_or(&self, default: bool) -> bool {
        self.show_all.unwrap_or(default)
    }

    /// Effective unused-choice toggle given a declaration's own default
    #[must_use]
    pub fn show_unused_filters_or(&self, default: bool) -> bool {
        self.show_unused_filters.unwrap_or(default)
    }
}
