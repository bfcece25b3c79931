use std::collections::BTreeMap;

use super::{FilterDefaults, lookup_key, require_title};
use crate::errors::FilterError;
use crate::field::FieldMetadata;
use crate::lookup::{ISNULL_TRUE, Lookup, LookupParams, PreparedValue, prepare_lookup_value};
use crate::models::Choice;
use crate::query_string::QueryString;
use crate::settings::FilterSettings;

/// Equality filter on one field: an exact-match key plus an is-null key.
///
/// The variants wrap this and add their own choice lists.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: FieldMetadata,
    pub field_path: String,
    pub title: String,
    pub lookup_kwarg: String,
    pub lookup_kwarg_isnull: String,
    /// Raw exact-match value seen in the request
    pub lookup_val: Option<String>,
    /// Raw is-null value seen in the request
    pub lookup_val_isnull: Option<String>,
    pub used_parameters: BTreeMap<String, PreparedValue>,
    pub show_all: bool,
    pub show_unused_filters: bool,
    pub empty_value_display: String,
}

impl FieldFilter {
    /// Claim `lookup_kwarg` and `{field_path}__isnull` from `params`.
    ///
    /// Returns the filter and the parameters left for later filters.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error when `title` is blank.
    pub fn new(
        field: FieldMetadata,
        field_path: &str,
        title: Option<&str>,
        lookup_kwarg: String,
        defaults: FilterDefaults,
        settings: &FilterSettings,
        mut params: LookupParams,
    ) -> Result<(Self, LookupParams), FilterError> {
        let title = require_title(field_path, title)?;
        let lookup_kwarg_isnull = lookup_key(&[field_path, "isnull"]);
        let lookup_val = params.get(&lookup_kwarg).cloned();
        let lookup_val_isnull = params.get(&lookup_kwarg_isnull).cloned();

        let mut used_parameters = BTreeMap::new();
        for param in [&lookup_kwarg, &lookup_kwarg_isnull] {
            if let Some(value) = params.remove(param.as_str()) {
                used_parameters.insert(param.clone(), prepare_lookup_value(param, &value));
            }
        }
        if !used_parameters.is_empty() {
            tracing::debug!(
                field = field_path,
                parameters = ?used_parameters.keys().collect::<Vec<_>>(),
                "Filter consumed parameters"
            );
        }

        let filter = Self {
            field,
            field_path: field_path.to_string(),
            title,
            lookup_kwarg,
            lookup_kwarg_isnull,
            lookup_val,
            lookup_val_isnull,
            used_parameters,
            show_all: settings.show_all_or(defaults.show_all),
            show_unused_filters: settings.show_unused_filters_or(defaults.show_unused_filters),
            empty_value_display: settings.empty_value_display.clone(),
        };
        Ok((filter, params))
    }

    #[must_use]
    pub fn expected_parameters(&self) -> Vec<String> {
        vec![self.lookup_kwarg.clone(), self.lookup_kwarg_isnull.clone()]
    }

    /// Typed lookups for every consumed parameter.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidLookup`] for values that do not coerce.
    pub fn lookups(&self) -> Result<Vec<Lookup>, FilterError> {
        let kind = self.field.lookup_kind();
        self.used_parameters
            .iter()
            .map(|(key, value)| Lookup::from_parameter(key, value, kind))
            .collect()
    }

    /// Neither of this filter's keys is in the request
    #[must_use]
    pub fn nothing_selected(&self) -> bool {
        self.lookup_val.is_none() && self.lookup_val_isnull.is_none()
    }

    /// The is-null key is present with a true value
    #[must_use]
    pub fn empty_selected(&self) -> bool {
        self.used_parameters
            .get(&self.lookup_kwarg_isnull)
            .and_then(PreparedValue::as_flag)
            .unwrap_or(false)
    }

    /// Raw values compare equal once coerced to the field's kind, so `True`
    /// selects the `true` choice of a boolean field.
    fn same_value(&self, raw: &str, value: &str) -> bool {
        let kind = self.field.lookup_kind();
        match (kind.coerce(raw), kind.coerce(value)) {
            (Ok(requested), Ok(offered)) => requested == offered,
            _ => raw == value,
        }
    }

    #[must_use]
    pub fn all_choice(&self, query: &QueryString) -> Choice {
        Choice {
            selected: self.nothing_selected(),
            query_string: query
                .remove(&[&self.lookup_kwarg, &self.lookup_kwarg_isnull])
                .url(),
            display: "All".to_string(),
        }
    }

    #[must_use]
    pub fn value_choice(&self, query: &QueryString, value: &str, display: String) -> Choice {
        Choice {
            selected: self
                .lookup_val
                .as_deref()
                .is_some_and(|raw| self.same_value(raw, value)),
            query_string: query
                .with_changes(&[(self.lookup_kwarg.as_str(), Some(value))], &[&self.lookup_kwarg_isnull])
                .url(),
            display,
        }
    }

    #[must_use]
    pub fn empty_choice(&self, query: &QueryString, display: String) -> Choice {
        Choice {
            selected: self.empty_selected(),
            query_string: query
                .with_changes(
                    &[(self.lookup_kwarg_isnull.as_str(), Some(ISNULL_TRUE))],
                    &[&self.lookup_kwarg],
                )
                .url(),
            display,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;
    use serde_json::json;

    fn build(params: &[(&str, &str)]) -> (FieldFilter, LookupParams) {
        let params = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        FieldFilter::new(
            FieldMetadata::new("Item", "price", FieldKind::Integer),
            "price",
            Some("Price"),
            "price__exact".to_string(),
            FilterDefaults::default(),
            &FilterSettings::default(),
            params,
        )
        .unwrap()
    }

    #[test]
    fn test_consumes_only_expected_parameters() {
        let (filter, remaining) = build(&[("price__exact", "10"), ("size", "L")]);
        assert_eq!(
            filter.used_parameters.get("price__exact"),
            Some(&PreparedValue::Text("10".to_string()))
        );
        assert_eq!(remaining.len(), 1);
        assert!(remaining.contains_key("size"));
    }

    #[test]
    fn test_lookups_coerce_to_field_kind() {
        let (filter, _) = build(&[("price__exact", "10")]);
        assert_eq!(filter.lookups().unwrap(), vec![Lookup::exact("price", json!(10))]);

        let (filter, _) = build(&[("price__exact", "ten")]);
        assert!(matches!(filter.lookups(), Err(FilterError::InvalidLookup { .. })));
    }

    #[test]
    fn test_false_isnull_does_not_select_empty_choice() {
        let (filter, _) = build(&[("price__isnull", "False")]);
        assert!(!filter.empty_selected());
        assert!(!filter.nothing_selected());
        assert_eq!(filter.lookups().unwrap(), vec![Lookup::is_null("price", false)]);
    }

    #[test]
    fn test_settings_override_defaults() {
        let settings = FilterSettings {
            show_all: Some(false),
            ..FilterSettings::default()
        };
        let (filter, _) = FieldFilter::new(
            FieldMetadata::new("Item", "price", FieldKind::Integer),
            "price",
            Some("Price"),
            "price__exact".to_string(),
            FilterDefaults::default(),
            &settings,
            LookupParams::new(),
        )
        .unwrap();
        assert!(!filter.show_all);
        assert!(filter.show_unused_filters);
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let result = FieldFilter::new(
            FieldMetadata::new("Item", "price", FieldKind::Integer),
            "price",
            Some(""),
            "price__exact".to_string(),
            FilterDefaults::default(),
            &FilterSettings::default(),
            LookupParams::new(),
        );
        assert!(matches!(result, Err(FilterError::Configuration { .. })));
    }
}
