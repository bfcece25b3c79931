//! # List filters
//!
//! A list filter owns a handful of query-string parameters, narrows a collection
//! with them and describes the options a user can pick from.
//!
//! ## Parameter names
//!
//! Field filters claim two keys each:
//!
//! ```text
//! GET /items/?category__id__exact=3     related filter, exact match on the target key
//! GET /items/?category__isnull=True     related filter, rows without a category
//! GET /items/?color__exact=red          static-choices filter
//! GET /items/?size=L                    distinct-values filter
//! ```
//!
//! ## Variants
//!
//! - [`RelatedFieldFilter`] for relation fields
//! - [`ChoicesFieldFilter`] for fields with declared static choices
//! - [`AllValuesFieldFilter`] for everything else, listing the distinct stored values
//!
//! Which variant a field gets is decided by a [`FilterRegistry`].
//!
//! Filters are built once per request. Building one removes the parameters it
//! claims from the mapping it is given and returns what is left.

mod all_values;
mod choices;
mod field;
mod registry;
mod related;

pub use all_values::AllValuesFieldFilter;
pub use choices::ChoicesFieldFilter;
pub use field::FieldFilter;
pub use registry::{FieldTest, FilterClass, FilterRegistry};
pub use related::RelatedFieldFilter;

use std::collections::BTreeMap;
use std::fmt;

use crate::collection::{Collection, ModelCatalog, WarningSink};
use crate::errors::{CollectionError, FilterError};
use crate::lookup::{LOOKUP_SEP, Lookup, PreparedValue};
use crate::models::Choice;
use crate::query_string::QueryString;
use crate::settings::FilterSettings;

/// Everything a filter may consult while it is being built.
pub struct FilterEnv<'a, M: ModelCatalog> {
    pub catalog: &'a M,
    /// Model the list view shows
    pub model: &'a str,
    pub settings: &'a FilterSettings,
    pub warnings: &'a dyn WarningSink,
}

impl<M: ModelCatalog> FilterEnv<'_, M> {
    /// Report a degraded choice list without failing the request.
    pub(crate) fn warn(&self, title: &str, err: &dyn fmt::Display) {
        tracing::warn!(filter = title, error = %err, "Could not compute filter choices");
        self.warnings.warn(&format!("{title}: {err}"));
    }
}

/// Per-declaration defaults, overridden by process-wide settings when those are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDefaults {
    pub show_all: bool,
    pub show_unused_filters: bool,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            show_all: true,
            show_unused_filters: true,
        }
    }
}

/// A filter built for one request.
pub trait ListFilter: fmt::Debug {
    /// Heading shown above the choices. Never empty.
    fn title(&self) -> &str;

    /// Field path the filter was declared on, if any
    fn field_path(&self) -> Option<&str> {
        None
    }

    /// Query-string keys this filter claims, in order.
    fn expected_parameters(&self) -> Vec<String>;

    /// Parameters taken from the request, prepared for lookup.
    fn used_parameters(&self) -> &BTreeMap<String, PreparedValue>;

    /// Whether rendering the filter would offer a meaningful choice.
    fn has_output(&self) -> bool;

    /// Lookups narrowing a collection to the current selection.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidLookup`] when a parameter value cannot be
    /// coerced to the field's type.
    fn lookups(&self) -> Result<Vec<Lookup>, FilterError>;

    /// Options to render, "All" first when enabled.
    fn choices(&self, query: &QueryString) -> Vec<Choice>;

    /// Current URL without any of this filter's parameters, or `None` when none
    /// of them are present.
    fn clear_filter_string(&self, query: &QueryString) -> Option<String> {
        let expected = self.expected_parameters();
        if expected.iter().any(|param| query.contains(param)) {
            Some(query.remove_exact(&expected).url())
        } else {
            None
        }
    }
}

/// Narrowing for any [`ListFilter`], boxed or not.
pub trait ApplyFilter {
    /// Narrow `collection` with this filter's lookups.
    ///
    /// # Errors
    ///
    /// Malformed values and lookups on fields the collection does not know
    /// surface as [`FilterError::InvalidLookup`]. Any other store failure is a
    /// [`FilterError::Collection`].
    fn apply<C: Collection>(&self, collection: &C) -> Result<C, FilterError>;
}

impl<F: ListFilter + ?Sized> ApplyFilter for F {
    fn apply<C: Collection>(&self, collection: &C) -> Result<C, FilterError> {
        let lookups = self.lookups()?;
        collection.filter(&lookups).map_err(|err| match err {
            CollectionError::UnknownField(_) => {
                let parameters: Vec<&str> = self.used_parameters().keys().map(String::as_str).collect();
                FilterError::invalid_lookup(parameters.join(","), err.to_string())
            }
            CollectionError::UnknownModel(_) | CollectionError::Query(_) => FilterError::Collection(err),
        })
    }
}

/// Check that a filter has a usable title.
///
/// # Errors
///
/// A missing or blank title is a configuration error naming `filter`.
pub fn require_title(filter: &str, title: Option<&str>) -> Result<String, FilterError> {
    match title.map(str::trim) {
        Some(title) if !title.is_empty() => Ok(title.to_string()),
        _ => Err(FilterError::configuration(format!(
            "The list view filter '{filter}' does not specify a 'title'."
        ))),
    }
}

/// Join path segments into a lookup key
pub(crate) fn lookup_key(parts: &[&str]) -> String {
    parts.join(LOOKUP_SEP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_title() {
        assert_eq!(require_title("Status", Some("Status")).unwrap(), "Status");
        assert!(matches!(
            require_title("StatusFilter", None),
            Err(FilterError::Configuration { .. })
        ));
        assert!(require_title("StatusFilter", Some("  ")).is_err());
    }

    #[test]
    fn test_lookup_key() {
        assert_eq!(lookup_key(&["category", "id", "exact"]), "category__id__exact");
    }
}
