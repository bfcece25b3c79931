use serde_json::Value;
use std::collections::BTreeMap;

use super::{FieldFilter, FilterDefaults, FilterEnv, ListFilter, lookup_key};
use crate::collection::{Collection, ModelCatalog};
use crate::errors::{CollectionError, FilterError};
use crate::field::FieldMetadata;
use crate::lookup::{Lookup, LookupParams, PreparedValue, value_to_string};
use crate::models::Choice;
use crate::query_string::QueryString;

/// Filter over a field's declared static choices.
///
/// A choice declared with a `null` value becomes the trailing empty choice.
#[derive(Debug, Clone)]
pub struct ChoicesFieldFilter {
    base: FieldFilter,
    lookup_choices: Vec<(Value, String)>,
}

impl ChoicesFieldFilter {
    /// # Errors
    ///
    /// Fails with a configuration error when the resolved title is blank.
    pub fn new<M: ModelCatalog>(
        field: FieldMetadata,
        field_path: &str,
        defaults: FilterDefaults,
        params: LookupParams,
        env: &FilterEnv<'_, M>,
    ) -> Result<(Self, LookupParams), FilterError> {
        let lookup_kwarg = lookup_key(&[field_path, "exact"]);
        let title = field
            .verbose_name
            .clone()
            .unwrap_or_else(|| field_path.to_string());
        let (base, remaining) = FieldFilter::new(
            field,
            field_path,
            Some(&title),
            lookup_kwarg,
            defaults,
            env.settings,
            params,
        )?;
        let lookup_choices = match Self::field_choices(&base, env) {
            Ok(choices) => choices,
            Err(err) => {
                env.warn(&base.title, &err);
                Vec::new()
            }
        };
        Ok((
            Self {
                base,
                lookup_choices,
            },
            remaining,
        ))
    }

    /// Declared choices, keeping only values present in the data when unused
    /// choices are hidden.
    fn field_choices<M: ModelCatalog>(
        base: &FieldFilter,
        env: &FilterEnv<'_, M>,
    ) -> Result<Vec<(Value, String)>, CollectionError> {
        let declared = base.field.choices.clone();
        if base.show_unused_filters {
            return Ok(declared);
        }
        let objects = env.catalog.objects(&base.field.model)?;
        let mut used = Vec::with_capacity(declared.len());
        for (value, label) in declared {
            let lookup = if value.is_null() {
                Lookup::is_null(&base.field.name, true)
            } else {
                Lookup::exact(&base.field.name, value.clone())
            };
            if objects.exists(&[lookup])? {
                used.push((value, label));
            }
        }
        Ok(used)
    }

    /// Label of the `null`-keyed choice, if one is declared and non-empty
    fn none_title(&self) -> Option<&str> {
        self.lookup_choices
            .iter()
            .rev()
            .find(|(value, _)| value.is_null())
            .map(|(_, label)| label.as_str())
            .filter(|label| !label.is_empty())
    }

    #[must_use]
    pub fn lookup_choices(&self) -> &[(Value, String)] {
        &self.lookup_choices
    }
}

impl ListFilter for ChoicesFieldFilter {
    fn title(&self) -> &str {
        &self.base.title
    }

    fn field_path(&self) -> Option<&str> {
        Some(&self.base.field_path)
    }

    fn expected_parameters(&self) -> Vec<String> {
        self.base.expected_parameters()
    }

    fn used_parameters(&self) -> &BTreeMap<String, PreparedValue> {
        &self.base.used_parameters
    }

    fn has_output(&self) -> bool {
        self.none_title().is_some() || self.lookup_choices.iter().any(|(value, _)| !value.is_null())
    }

    fn lookups(&self) -> Result<Vec<Lookup>, FilterError> {
        self.base.lookups()
    }

    fn choices(&self, query: &QueryString) -> Vec<Choice> {
        let mut choices = Vec::with_capacity(self.lookup_choices.len() + 1);
        if self.base.show_all {
            choices.push(self.base.all_choice(query));
        }
        for (value, label) in &self.lookup_choices {
            if value.is_null() {
                continue;
            }
            choices.push(
                self.base
                    .value_choice(query, &value_to_string(value), label.clone()),
            );
        }
        if let Some(none_title) = self.none_title() {
            choices.push(self.base.empty_choice(query, none_title.to_string()));
        }
        choices
    }
}
