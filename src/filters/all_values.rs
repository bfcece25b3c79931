use serde_json::Value;
use std::collections::BTreeMap;

use super::{FieldFilter, FilterDefaults, FilterEnv, ListFilter};
use crate::collection::{Collection, ModelCatalog};
use crate::errors::FilterError;
use crate::field::FieldMetadata;
use crate::lookup::{Lookup, LookupParams, PreparedValue, value_to_string};
use crate::models::Choice;
use crate::query_string::QueryString;

/// Fallback filter listing every distinct stored value of the field.
///
/// Values come from the model owning the field, unfiltered, in ascending order.
/// The exact-match key is the bare field path.
#[derive(Debug, Clone)]
pub struct AllValuesFieldFilter {
    base: FieldFilter,
    lookup_choices: Vec<Value>,
}

impl AllValuesFieldFilter {
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
        let title = field
            .verbose_name
            .clone()
            .unwrap_or_else(|| field_path.to_string());
        let (base, remaining) = FieldFilter::new(
            field,
            field_path,
            Some(&title),
            field_path.to_string(),
            defaults,
            env.settings,
            params,
        )?;
        let lookup_choices = match env
            .catalog
            .objects(&base.field.model)
            .and_then(|objects| objects.distinct_values(&base.field.name))
        {
            Ok(values) => values,
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

    #[must_use]
    pub fn lookup_choices(&self) -> &[Value] {
        &self.lookup_choices
    }
}

impl ListFilter for AllValuesFieldFilter {
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
        !self.lookup_choices.is_empty()
    }

    fn lookups(&self) -> Result<Vec<Lookup>, FilterError> {
        self.base.lookups()
    }

    fn choices(&self, query: &QueryString) -> Vec<Choice> {
        let mut choices = Vec::with_capacity(self.lookup_choices.len() + 1);
        if self.base.show_all {
            choices.push(self.base.all_choice(query));
        }
        let mut include_none = false;
        for value in &self.lookup_choices {
            if value.is_null() {
                include_none = true;
                continue;
            }
            let value = value_to_string(value);
            choices.push(self.base.value_choice(query, &value, value.clone()));
        }
        if include_none {
            choices.push(
                self.base
                    .empty_choice(query, self.base.empty_value_display.clone()),
            );
        }
        choices
    }
}
