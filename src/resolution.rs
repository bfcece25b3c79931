//! Turning declarations plus request parameters into the filters for one request.
//!
//! Declarations are built strictly in order and each one takes the parameters
//! it claims out of the mapping before the next one runs. When two declarations
//! claim the same key, the first wins and the second sees the key as absent.

use sea_orm::Condition;
use std::fmt;
use std::sync::Arc;

use crate::collection::{Collection, ModelCatalog};
use crate::conditions::{default_column, lookups_condition};
use crate::errors::FilterError;
use crate::field::FieldMetadata;
use crate::filters::{ApplyFilter, FilterClass, FilterDefaults, FilterEnv, FilterRegistry, ListFilter, require_title};
use crate::lookup::{Lookup, LookupParams};

/// Builds a custom filter from the remaining parameters, returning the filter
/// and the parameters it did not claim.
pub type FilterFactory<M> = Arc<
    dyn Fn(&FilterEnv<'_, M>, LookupParams) -> Result<(Box<dyn ListFilter>, LookupParams), FilterError>
        + Send
        + Sync,
>;

/// One filter declared on a list view.
pub enum Declaration<M: ModelCatalog> {
    /// A field path, optionally pinned to a filter class instead of the registry's pick
    Field {
        path: String,
        class: Option<FilterClass>,
        defaults: FilterDefaults,
    },
    /// A filter built by user code
    Custom(FilterFactory<M>),
}

impl<M: ModelCatalog> Declaration<M> {
    #[must_use]
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field {
            path: path.into(),
            class: None,
            defaults: FilterDefaults::default(),
        }
    }

    #[must_use]
    pub fn field_with(path: impl Into<String>, class: FilterClass) -> Self {
        Self::Field {
            path: path.into(),
            class: Some(class),
            defaults: FilterDefaults::default(),
        }
    }

    pub fn custom<F>(factory: F) -> Self
    where
        F: Fn(&FilterEnv<'_, M>, LookupParams) -> Result<(Box<dyn ListFilter>, LookupParams), FilterError>
            + Send
            + Sync
            + 'static,
    {
        Self::Custom(Arc::new(factory))
    }

    /// Default for the "All" choice, used unless the process setting is set
    #[must_use]
    pub fn show_all(mut self, show_all: bool) -> Self {
        if let Self::Field { defaults, .. } = &mut self {
            defaults.show_all = show_all;
        }
        self
    }

    /// Default for listing unused choices, used unless the process setting is set
    #[must_use]
    pub fn show_unused_filters(mut self, show_unused_filters: bool) -> Self {
        if let Self::Field { defaults, .. } = &mut self {
            defaults.show_unused_filters = show_unused_filters;
        }
        self
    }

    #[must_use]
    pub fn field_path(&self) -> Option<&str> {
        match self {
            Self::Field { path, .. } => Some(path),
            Self::Custom(_) => None,
        }
    }
}

impl<M: ModelCatalog> Clone for Declaration<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Field {
                path,
                class,
                defaults,
            } => Self::Field {
                path: path.clone(),
                class: *class,
                defaults: *defaults,
            },
            Self::Custom(factory) => Self::Custom(Arc::clone(factory)),
        }
    }
}

impl<M: ModelCatalog> fmt::Debug for Declaration<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field {
                path,
                class,
                defaults,
            } => f
                .debug_struct("Field")
                .field("path", path)
                .field("class", class)
                .field("defaults", defaults)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Filters built for one request and what they left behind.
#[derive(Debug)]
pub struct Resolution {
    /// Filters with output, in declaration order
    pub filters: Vec<Box<dyn ListFilter>>,
    pub has_filters: bool,
    /// Parameters no filter claimed
    pub leftover: LookupParams,
    /// A consumed parameter crosses a many-relation, so rows may repeat
    pub may_have_duplicates: bool,
    /// At least one kept filter consumed a parameter
    pub has_active_filters: bool,
}

impl Resolution {
    /// Narrow `collection` by every filter, in declaration order.
    ///
    /// # Errors
    ///
    /// Stops at the first filter whose parameters are invalid.
    pub fn apply<C: Collection>(&self, collection: C) -> Result<C, FilterError> {
        self.filters
            .iter()
            .try_fold(collection, |narrowed, filter| filter.apply(&narrowed))
    }

    /// All lookups of all filters.
    ///
    /// # Errors
    ///
    /// Returns the first invalid lookup.
    pub fn lookups(&self) -> Result<Vec<Lookup>, FilterError> {
        let mut lookups = Vec::new();
        for filter in &self.filters {
            lookups.extend(filter.lookups()?);
        }
        Ok(lookups)
    }

    /// The lookups as one sea-orm condition, with paths mapped by
    /// [`default_column`].
    ///
    /// # Errors
    ///
    /// Returns the first invalid lookup.
    pub fn condition(&self) -> Result<Condition, FilterError> {
        lookups_condition(&self.lookups()?, default_column)
    }

    /// The filter declared on `field_path`, if it was kept
    #[must_use]
    pub fn filter_by_name(&self, field_path: &str) -> Option<&dyn ListFilter> {
        self.filters
            .iter()
            .find(|filter| filter.field_path() == Some(field_path))
            .map(|filter| filter.as_ref())
    }
}

/// `params` without any of the `ignored` keys. The input is left untouched.
#[must_use]
pub fn filters_params(params: &LookupParams, ignored: &[String]) -> LookupParams {
    params
        .iter()
        .filter(|(key, _)| !ignored.contains(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Build the filter for one declaration.
///
/// Returns the filter, or `None` when no registered class accepts the field,
/// together with the parameters it did not claim.
///
/// # Errors
///
/// Unknown field paths and missing titles are configuration errors.
pub fn construct<M: ModelCatalog>(
    declaration: &Declaration<M>,
    params: LookupParams,
    env: &FilterEnv<'_, M>,
    registry: &FilterRegistry,
) -> Result<(Option<Box<dyn ListFilter>>, LookupParams), FilterError> {
    match declaration {
        Declaration::Custom(factory) => {
            let (filter, remaining) = factory(env, params)?;
            require_title(filter.field_path().unwrap_or("custom filter"), Some(filter.title()))?;
            Ok((Some(filter), remaining))
        }
        Declaration::Field {
            path,
            class,
            defaults,
        } => {
            let field = env
                .catalog
                .resolve_path(env.model, path)?
                .pop()
                .ok_or_else(|| FilterError::configuration("empty field path in filter declaration"))?;
            let Some(class) = class.or_else(|| registry.select(&field)) else {
                tracing::debug!(field = %path, "No filter class accepts this field");
                return Ok((None, params));
            };
            let (filter, remaining) = class.construct(field, path, *defaults, params, env)?;
            Ok((Some(filter), remaining))
        }
    }
}

fn spawns_duplicates<M: ModelCatalog>(env: &FilterEnv<'_, M>, path: &str) -> bool {
    env.catalog
        .resolve_path(env.model, path)
        .is_ok_and(|fields| fields.iter().any(FieldMetadata::is_many_relation))
}

/// Build every declared filter for a request.
///
/// Ignored parameters are dropped from a copy of `params` first; the caller's
/// mapping is never modified.
///
/// # Errors
///
/// A configuration error in any declaration aborts the whole resolution.
pub fn resolve<M: ModelCatalog>(
    declarations: &[Declaration<M>],
    params: &LookupParams,
    env: &FilterEnv<'_, M>,
    registry: &FilterRegistry,
) -> Result<Resolution, FilterError> {
    let mut lookup_params = filters_params(params, &env.settings.ignored_params());
    let mut filters: Vec<Box<dyn ListFilter>> = Vec::new();
    let mut may_have_duplicates = false;
    let mut has_active_filters = false;

    for declaration in declarations {
        let params_count = lookup_params.len();
        let (filter, remaining) = construct(declaration, lookup_params, env, registry)?;
        lookup_params = remaining;
        let consumed = lookup_params.len() < params_count;

        if consumed && let Some(path) = declaration.field_path() {
            may_have_duplicates |= spawns_duplicates(env, path);
        }

        match filter {
            Some(filter) if filter.has_output() => {
                has_active_filters |= consumed;
                tracing::debug!(filter = filter.title(), active = consumed, "Resolved list filter");
                filters.push(filter);
            }
            Some(filter) => {
                tracing::debug!(filter = filter.title(), "Dropping list filter without output");
            }
            None => {}
        }
    }

    Ok(Resolution {
        has_filters: !filters.is_empty(),
        filters,
        leftover: lookup_params,
        may_have_duplicates,
        has_active_filters,
    })
}
