//! Lookup parameters: the `field__sub__op=value` keys that filters consume.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::FilterError;
use crate::field::FieldKind;

/// Separator between path segments and the operator in a lookup key
pub const LOOKUP_SEP: &str = "__";

/// Canonical is-null value written into generated query strings
pub const ISNULL_TRUE: &str = "True";

/// Request parameters still available to filters, keyed by query-string name.
pub type LookupParams = BTreeMap<String, String>;

/// Comparison performed by a [`Lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOp {
    Exact,
    IsNull,
    In,
}

impl LookupOp {
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "exact" => Some(Self::Exact),
            "isnull" => Some(Self::IsNull),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IsNull => "isnull",
            Self::In => "in",
        }
    }
}

/// A parameter value after consumption, before type coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PreparedValue {
    Text(String),
    Flag(bool),
    List(Vec<String>),
}

impl PreparedValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            _ => None,
        }
    }
}

/// Whether an is-null parameter value switches the lookup on
#[must_use]
pub fn is_truthy(raw: &str) -> bool {
    !matches!(raw.to_ascii_lowercase().as_str(), "" | "false" | "0")
}

/// Prepare a raw parameter value according to the operator in its key.
#[must_use]
pub fn prepare_lookup_value(key: &str, value: &str) -> PreparedValue {
    if key.ends_with("__in") {
        PreparedValue::List(value.split(',').map(str::to_string).collect())
    } else if key.ends_with("__isnull") {
        PreparedValue::Flag(is_truthy(value))
    } else {
        PreparedValue::Text(value.to_string())
    }
}

/// Split a lookup key into its field path and operator. A key without a known
/// operator suffix is an exact match on the whole path.
#[must_use]
pub fn parse_lookup_key(key: &str) -> (Vec<String>, LookupOp) {
    let mut parts: Vec<String> = key.split(LOOKUP_SEP).map(str::to_string).collect();
    if parts.len() > 1
        && let Some(op) = parts.last().and_then(|last| LookupOp::from_suffix(last))
    {
        parts.pop();
        return (parts, op);
    }
    (parts, LookupOp::Exact)
}

/// One narrowing condition over a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// Field path segments, relations first
    pub path: Vec<String>,
    pub op: LookupOp,
    pub value: Value,
}

impl Lookup {
    /// Exact match on a `__`-separated field path
    #[must_use]
    pub fn exact(path: &str, value: impl Into<Value>) -> Self {
        Self {
            path: split_path(path),
            op: LookupOp::Exact,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn is_null(path: &str, is_null: bool) -> Self {
        Self {
            path: split_path(path),
            op: LookupOp::IsNull,
            value: Value::Bool(is_null),
        }
    }

    /// The path joined back with [`LOOKUP_SEP`]
    #[must_use]
    pub fn field(&self) -> String {
        self.path.join(LOOKUP_SEP)
    }

    /// Build a typed lookup from a consumed parameter.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidLookup`] when a value does not coerce to `kind`.
    pub fn from_parameter(key: &str, value: &PreparedValue, kind: FieldKind) -> Result<Self, FilterError> {
        let (path, op) = parse_lookup_key(key);
        let coerce = |raw: &str| kind.coerce(raw).map_err(|reason| FilterError::invalid_lookup(key, reason));
        let value = match (op, value) {
            (LookupOp::IsNull, PreparedValue::Flag(flag)) => Value::Bool(*flag),
            (LookupOp::IsNull, PreparedValue::Text(raw)) => Value::Bool(is_truthy(raw)),
            (LookupOp::In, PreparedValue::List(items)) => {
                Value::Array(items.iter().map(|item| coerce(item)).collect::<Result<_, _>>()?)
            }
            (_, PreparedValue::Text(raw)) => coerce(raw)?,
            (_, other) => {
                return Err(FilterError::invalid_lookup(
                    key,
                    format!("unexpected value {other:?} for a '{}' lookup", op.suffix()),
                ));
            }
        };
        Ok(Self { path, op, value })
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split(LOOKUP_SEP).map(str::to_string).collect()
}

/// Render a field value the way choices and query strings show it.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
