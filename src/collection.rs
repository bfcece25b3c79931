//! Interfaces to the host application's data layer.
//!
//! Filters narrow and inspect data through these traits only, so the same filter
//! code runs against a database-backed adapter or the in-memory
//! [`MemoryCatalog`](crate::memory::MemoryCatalog).

use serde_json::Value;
use std::cell::RefCell;

use crate::errors::{CollectionError, FilterError};
use crate::field::FieldMetadata;
use crate::lookup::{LOOKUP_SEP, Lookup};

/// A queryable set of rows of one model.
pub trait Collection: Sized {
    /// Narrow to the rows matching every lookup.
    ///
    /// # Errors
    ///
    /// Returns an error when a lookup names an unknown field or the store rejects it.
    fn filter(&self, lookups: &[Lookup]) -> Result<Self, CollectionError>;

    /// Distinct values of `field`, ascending, with `null` included if present.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot compute the values.
    fn distinct_values(&self, field: &str) -> Result<Vec<Value>, CollectionError>;

    /// `(primary key, display)` pairs for every row, in collection order.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot list the rows.
    fn labelled(&self) -> Result<Vec<(Value, String)>, CollectionError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any row matches every lookup.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Collection::filter`].
    fn exists(&self, lookups: &[Lookup]) -> Result<bool, CollectionError> {
        Ok(!self.filter(lookups)?.is_empty())
    }
}

/// Field introspection and unfiltered collections, per model.
pub trait ModelCatalog {
    type Collection: Collection;

    /// Metadata of field `name` on `model`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown model or field.
    fn field(&self, model: &str, name: &str) -> Result<FieldMetadata, CollectionError>;

    /// Every row of `model`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown model.
    fn objects(&self, model: &str) -> Result<Self::Collection, CollectionError>;

    /// Resolve a `__`-separated path from `model`, following relations. The last
    /// element is the field the path ends on.
    ///
    /// # Errors
    ///
    /// A path that does not resolve is a configuration error.
    fn resolve_path(&self, model: &str, path: &str) -> Result<Vec<FieldMetadata>, FilterError> {
        let invalid = |reason: String| {
            FilterError::configuration(format!(
                "'{path}' is not a valid field path on '{model}': {reason}"
            ))
        };
        let mut fields = Vec::new();
        let mut current = model.to_string();
        let mut segments = path.split(LOOKUP_SEP).peekable();
        while let Some(segment) = segments.next() {
            let field = self
                .field(&current, segment)
                .map_err(|err| invalid(err.to_string()))?;
            if segments.peek().is_some() {
                match &field.relation {
                    Some(relation) => current.clone_from(&relation.model),
                    None => return Err(invalid(format!("'{segment}' is not a relation"))),
                }
            }
            fields.push(field);
        }
        Ok(fields)
    }
}

/// Channel for non-fatal, user-visible warnings.
pub trait WarningSink {
    fn warn(&self, message: &str);
}

/// Collects warnings raised while serving one request.
#[derive(Debug, Default)]
pub struct Messages {
    warnings: RefCell<Vec<String>>,
}

impl Messages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    /// Drain the collected warnings
    pub fn take(&self) -> Vec<String> {
        self.warnings.take()
    }
}

impl WarningSink for Messages {
    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}
