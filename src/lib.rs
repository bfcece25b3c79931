//! Query-string driven filters for admin-style list views.
//!
//! A [`ListView`] declares filters by field path. For every request the filters
//! claim their parameters from the query string, narrow the model's collection
//! and describe the choices a user can pick, each with a ready-made link.

pub mod collection;
pub mod conditions;
pub mod errors;
pub mod field;
pub mod filters;
pub mod lookup;
pub mod memory;
pub mod models;
pub mod query_string;
pub mod resolution;
pub mod settings;
pub mod view;

pub use collection::{Collection, Messages, ModelCatalog, WarningSink};
pub use errors::{CollectionError, FilterError};
pub use field::{FieldKind, FieldMetadata, Relation};
pub use filters::{
    AllValuesFieldFilter, ApplyFilter, ChoicesFieldFilter, FieldFilter, FilterClass, FilterDefaults, FilterEnv,
    FilterRegistry, ListFilter, RelatedFieldFilter,
};
pub use lookup::{Lookup, LookupOp, LookupParams, PreparedValue};
pub use memory::{MemoryCatalog, MemoryCollection};
pub use models::{Choice, FilterContext, FilterEntry};
pub use query_string::QueryString;
pub use resolution::{Declaration, FilterFactory, Resolution, construct, resolve};
pub use settings::{FilterSettings, Settings};
pub use view::{FilteredList, FullPath, ListView};
