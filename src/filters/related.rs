use serde_json::Value;
use std::collections::BTreeMap;

use super::{FieldFilter, FilterDefaults, FilterEnv, ListFilter, lookup_key};
use crate::collection::{Collection, ModelCatalog};
use crate::errors::{CollectionError, FilterError};
use crate::field::{FieldMetadata, Relation};
use crate::lookup::{Lookup, LookupParams, PreparedValue, value_to_string};
use crate::models::Choice;
use crate::query_string::QueryString;

/// Filter on a relation, offering one choice per related object.
///
/// Claims `{path}__{target}__exact` and `{path}__isnull`. A nullable or
/// many-to-many relation also gets a trailing empty choice.
#[derive(Debug, Clone)]
pub struct RelatedFieldFilter {
    base: FieldFilter,
    /// `(primary key, display)` of each related object on offer
    lookup_choices: Vec<(Value, String)>,
}

impl RelatedFieldFilter {
    /// # Errors
    ///
    /// Fails with a configuration error when `field` is not a relation or the
    /// resolved title is blank.
    pub fn new<M: ModelCatalog>(
        field: FieldMetadata,
        field_path: &str,
        defaults: FilterDefaults,
        params: LookupParams,
        env: &FilterEnv<'_, M>,
    ) -> Result<(Self, LookupParams), FilterError> {
        let relation = field.relation.clone().ok_or_else(|| {
            FilterError::configuration(format!(
                "'{field_path}' is not a relation and cannot use a related filter"
            ))
        })?;
        let lookup_kwarg = lookup_key(&[field_path, relation.field.as_str(), "exact"]);
        let title = field
            .verbose_name
            .clone()
            .or_else(|| relation.verbose_name.clone())
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
        let lookup_choices = match Self::field_choices(&base, &relation, env) {
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

    fn field_choices<M: ModelCatalog>(
        base: &FieldFilter,
        relation: &Relation,
        env: &FilterEnv<'_, M>,
    ) -> Result<Vec<(Value, String)>, CollectionError> {
        let related = env.catalog.objects(&relation.model)?.labelled()?;
        if base.show_unused_filters {
            return Ok(related);
        }
        let used = env
            .catalog
            .objects(&base.field.model)?
            .distinct_values(&lookup_key(&[base.field.name.as_str(), relation.field.as_str()]))?;
        Ok(related
            .into_iter()
            .filter(|(pk, _)| used.contains(pk))
            .collect())
    }

    /// Whether an empty choice is offered
    #[must_use]
    pub fn include_empty_choice(&self) -> bool {
        self.base.field.nullable || self.base.field.is_many_relation()
    }

    #[must_use]
    pub fn lookup_choices(&self) -> &[(Value, String)] {
        &self.lookup_choices
    }
}

impl ListFilter for RelatedFieldFilter {
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
        let extra = usize::from(self.include_empty_choice());
        self.lookup_choices.len() + extra > 1
    }

    fn lookups(&self) -> Result<Vec<Lookup>, FilterError> {
        self.base.lookups()
    }

    fn choices(&self, query: &QueryString) -> Vec<Choice> {
        let mut choices = Vec::with_capacity(self.lookup_choices.len() + 2);
        if self.base.show_all {
            choices.push(self.base.all_choice(query));
        }
        for (pk, display) in &self.lookup_choices {
            choices.push(
                self.base
                    .value_choice(query, &value_to_string(pk), display.clone()),
            );
        }
        if self.include_empty_choice() {
            choices.push(
                self.base
                    .empty_choice(query, self.base.empty_value_display.clone()),
            );
        }
        choices
    }
}
