use std::fmt;

use super::{AllValuesFieldFilter, ChoicesFieldFilter, FilterDefaults, FilterEnv, ListFilter, RelatedFieldFilter};
use crate::collection::ModelCatalog;
use crate::errors::FilterError;
use crate::field::FieldMetadata;
use crate::lookup::LookupParams;

/// Predicate deciding whether a filter class suits a field
pub type FieldTest = fn(&FieldMetadata) -> bool;

/// The built-in field filter variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterClass {
    Related,
    Choices,
    AllValues,
}

impl FilterClass {
    /// Build this variant for `field`, consuming the parameters it claims.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors from the variant's constructor.
    pub fn construct<M: ModelCatalog>(
        self,
        field: FieldMetadata,
        field_path: &str,
        defaults: FilterDefaults,
        params: LookupParams,
        env: &FilterEnv<'_, M>,
    ) -> Result<(Box<dyn ListFilter>, LookupParams), FilterError> {
        Ok(match self {
            Self::Related => {
                let (filter, remaining) = RelatedFieldFilter::new(field, field_path, defaults, params, env)?;
                (Box::new(filter), remaining)
            }
            Self::Choices => {
                let (filter, remaining) = ChoicesFieldFilter::new(field, field_path, defaults, params, env)?;
                (Box::new(filter), remaining)
            }
            Self::AllValues => {
                let (filter, remaining) = AllValuesFieldFilter::new(field, field_path, defaults, params, env)?;
                (Box::new(filter), remaining)
            }
        })
    }
}

/// Ordered `(test, class)` pairs; the first passing test picks the class.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone)]
pub struct FilterRegistry {
    entries: Vec<(FieldTest, FilterClass)>,
    priority_index: usize,
}

fn is_relation(field: &FieldMetadata) -> bool {
    field.is_relation()
}

fn has_choices(field: &FieldMetadata) -> bool {
    field.has_choices()
}

fn any_field(_: &FieldMetadata) -> bool {
    true
}

impl FilterRegistry {
    /// A registry with no entries
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            priority_index: 0,
        }
    }

    /// Add an entry. Priority entries go ahead of every regular entry, in the
    /// order they were registered.
    #[must_use]
    pub fn register(mut self, test: FieldTest, class: FilterClass, take_priority: bool) -> Self {
        if take_priority {
            self.entries.insert(self.priority_index, (test, class));
            self.priority_index += 1;
        } else {
            self.entries.push((test, class));
        }
        self
    }

    /// Class of the first entry whose test accepts `field`
    #[must_use]
    pub fn select(&self, field: &FieldMetadata) -> Option<FilterClass> {
        self.entries
            .iter()
            .find(|(test, _)| test(field))
            .map(|(_, class)| *class)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FilterRegistry {
    /// Relations, then static choices, then the distinct-values fallback.
    fn default() -> Self {
        Self::empty()
            .register(is_relation, FilterClass::Related, false)
            .register(has_choices, FilterClass::Choices, false)
            .register(any_field, FilterClass::AllValues, false)
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field(
                "classes",
                &self.entries.iter().map(|(_, class)| class).collect::<Vec<_>>(),
            )
            .field("priority_index", &self.priority_index)
            .finish()
    }
}
