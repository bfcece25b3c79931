//! Field metadata supplied by the host application.
//!
//! The filters never introspect models themselves. A
//! [`ModelCatalog`](crate::collection::ModelCatalog) resolves a field path to a
//! chain of [`FieldMetadata`] values and the filters work from those alone.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Storage type of a field, used to coerce query-string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
    Uuid,
    /// ISO 8601 calendar date (`YYYY-MM-DD`)
    Date,
}

impl FieldKind {
    /// Convert a raw query-string value into a typed value for this kind.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when `raw` is not a valid value.
    pub fn coerce(self, raw: &str) -> Result<Value, String> {
        let trimmed = raw.trim();
        match self {
            Self::Text => Ok(Value::String(raw.to_string())),
            Self::Integer => trimmed
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{raw}' is not a valid integer")),
            Self::Float => trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{raw}' is not a valid number")),
            Self::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("'{raw}' value must be either True or False")),
            },
            Self::Uuid => Uuid::parse_str(trimmed)
                .map(|uuid| Value::String(uuid.to_string()))
                .map_err(|_| format!("'{raw}' is not a valid UUID")),
            Self::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                .map_err(|_| format!("'{raw}' value has an invalid date format, expected YYYY-MM-DD")),
        }
    }
}

/// Target of a relation field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Related model name
    pub model: String,
    /// Field on the related model the relation points at (usually the primary key)
    pub field: String,
    /// Kind of that target field
    pub field_kind: FieldKind,
    /// Whether one row can relate to many targets
    pub many: bool,
    /// Display name of the related model
    pub verbose_name: Option<String>,
}

impl Relation {
    /// A many-to-one relation onto `model.field`
    #[must_use]
    pub fn foreign_key(model: impl Into<String>, field: impl Into<String>, field_kind: FieldKind) -> Self {
        Self {
            model: model.into(),
            field: field.into(),
            field_kind,
            many: false,
            verbose_name: None,
        }
    }

    /// A many-to-many relation onto `model.field`
    #[must_use]
    pub fn many_to_many(model: impl Into<String>, field: impl Into<String>, field_kind: FieldKind) -> Self {
        Self {
            many: true,
            ..Self::foreign_key(model, field, field_kind)
        }
    }

    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = Some(name.into());
        self
    }
}

/// Everything the filters need to know about one model field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    /// Model owning the field
    pub model: String,
    pub verbose_name: Option<String>,
    pub kind: FieldKind,
    pub nullable: bool,
    pub relation: Option<Relation>,
    /// Declared `(value, label)` pairs. A `null` value labels the empty choice.
    pub choices: Vec<(Value, String)>,
}

impl FieldMetadata {
    #[must_use]
    pub fn new(model: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            verbose_name: None,
            kind,
            nullable: false,
            relation: None,
            choices: Vec::new(),
        }
    }

    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.kind = relation.field_kind;
        self.relation = Some(relation);
        self
    }

    #[must_use]
    pub fn choices<V, L>(mut self, choices: impl IntoIterator<Item = (V, L)>) -> Self
    where
        V: Into<Value>,
        L: Into<String>,
    {
        self.choices = choices
            .into_iter()
            .map(|(value, label)| (value.into(), label.into()))
            .collect();
        self
    }

    #[must_use]
    pub fn is_relation(&self) -> bool {
        self.relation.is_some()
    }

    #[must_use]
    pub fn is_many_relation(&self) -> bool {
        self.relation.as_ref().is_some_and(|relation| relation.many)
    }

    #[must_use]
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Kind used to coerce exact-match values for this field
    #[must_use]
    pub fn lookup_kind(&self) -> FieldKind {
        self.relation
            .as_ref()
            .map_or(self.kind, |relation| relation.field_kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_integer() {
        assert_eq!(FieldKind::Integer.coerce(" 42 ").unwrap(), json!(42));
        assert!(FieldKind::Integer.coerce("forty-two").is_err());
    }

    #[test]
    fn test_coerce_float_rejects_nan() {
        assert_eq!(FieldKind::Float.coerce("2.5").unwrap(), json!(2.5));
        assert!(FieldKind::Float.coerce("NaN").is_err());
    }

    #[test]
    fn test_coerce_boolean() {
        assert_eq!(FieldKind::Boolean.coerce("True").unwrap(), json!(true));
        assert_eq!(FieldKind::Boolean.coerce("0").unwrap(), json!(false));
        assert!(FieldKind::Boolean.coerce("maybe").is_err());
    }

    #[test]
    fn test_coerce_uuid_normalizes() {
        let value = FieldKind::Uuid
            .coerce("550E8400-E29B-41D4-A716-446655440000")
            .unwrap();
        assert_eq!(value, json!("550e8400-e29b-41d4-a716-446655440000"));
        assert!(FieldKind::Uuid.coerce("not-a-uuid").is_err());
    }

    #[test]
    fn test_coerce_date() {
        assert_eq!(FieldKind::Date.coerce("2024-02-29").unwrap(), json!("2024-02-29"));
        assert!(FieldKind::Date.coerce("2023-02-29").is_err());
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        assert_eq!(FieldKind::Text.coerce(" red ").unwrap(), json!(" red "));
    }

    #[test]
    fn test_relation_sets_lookup_kind() {
        let field = FieldMetadata::new("Item", "owner", FieldKind::Text)
            .relation(Relation::foreign_key("User", "id", FieldKind::Uuid));
        assert!(field.is_relation());
        assert!(!field.is_many_relation());
        assert_eq!(field.lookup_kind(), FieldKind::Uuid);
    }

    #[test]
    fn test_choices_builder() {
        let field = FieldMetadata::new("Item", "color", FieldKind::Text)
            .choices([(json!("red"), "Red"), (Value::Null, "Unknown")]);
        assert!(field.has_choices());
        assert_eq!(field.choices[1], (Value::Null, "Unknown".to_string()));
    }
}
