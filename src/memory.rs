//! In-memory data source over JSON rows.
//!
//! Rows are JSON objects. A many-to-one relation is stored as the nested related
//! object (or `null`), a many-to-many relation as an array of related objects, so
//! a lookup on `category__id` reads `row["category"]["id"]`.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::collection::{Collection, ModelCatalog};
use crate::errors::CollectionError;
use crate::field::FieldMetadata;
use crate::lookup::{LOOKUP_SEP, Lookup, LookupOp, value_to_string};

static NULL: Value = Value::Null;

/// A collection of JSON rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCollection {
    rows: Vec<Value>,
    pk: String,
    display: String,
    known_fields: Vec<String>,
}

impl MemoryCollection {
    /// Rows keyed by `id` and displayed by `name`
    #[must_use]
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            pk: "id".to_string(),
            display: "name".to_string(),
            known_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_keys(mut self, pk: impl Into<String>, display: impl Into<String>) -> Self {
        self.pk = pk.into();
        self.display = display.into();
        self
    }

    /// Reject lookups whose first path segment is not one of `fields`
    #[must_use]
    pub fn with_known_fields(mut self, fields: Vec<String>) -> Self {
        self.known_fields = fields;
        self
    }

    #[must_use]
    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    fn check_field(&self, path: &[String]) -> Result<(), CollectionError> {
        match path.first() {
            Some(head) if self.known_fields.is_empty() || self.known_fields.contains(head) => Ok(()),
            _ => Err(CollectionError::UnknownField(path.join(LOOKUP_SEP))),
        }
    }
}

fn resolve<'a>(value: &'a Value, path: &[String]) -> Vec<&'a Value> {
    let Some((head, rest)) = path.split_first() else {
        return match value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
    };
    match value {
        Value::Object(map) => resolve(map.get(head).unwrap_or(&NULL), rest),
        Value::Array(items) => items.iter().flat_map(|item| resolve(item, path)).collect(),
        _ => vec![&NULL],
    }
}

fn same_value(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn row_matches(row: &Value, lookup: &Lookup) -> bool {
    let values = resolve(row, &lookup.path);
    match lookup.op {
        LookupOp::Exact => values.iter().any(|value| same_value(value, &lookup.value)),
        LookupOp::In => match &lookup.value {
            Value::Array(candidates) => values
                .iter()
                .any(|value| candidates.iter().any(|candidate| same_value(value, candidate))),
            single => values.iter().any(|value| same_value(value, single)),
        },
        LookupOp::IsNull => {
            let is_null = values.iter().all(|value| value.is_null());
            Some(is_null) == lookup.value.as_bool()
        }
    }
}

impl Collection for MemoryCollection {
    fn filter(&self, lookups: &[Lookup]) -> Result<Self, CollectionError> {
        for lookup in lookups {
            self.check_field(&lookup.path)?;
        }
        let rows = self
            .rows
            .iter()
            .filter(|row| lookups.iter().all(|lookup| row_matches(row, lookup)))
            .cloned()
            .collect();
        Ok(Self {
            rows,
            ..self.clone()
        })
    }

    fn distinct_values(&self, field: &str) -> Result<Vec<Value>, CollectionError> {
        let path: Vec<String> = field.split(LOOKUP_SEP).map(str::to_string).collect();
        self.check_field(&path)?;
        let mut values: Vec<Value> = self
            .rows
            .iter()
            .flat_map(|row| {
                let found = resolve(row, &path);
                if found.is_empty() { vec![&NULL] } else { found }
            })
            .cloned()
            .collect();
        values.sort_by(compare_values);
        values.dedup_by(|a, b| same_value(a, b));
        Ok(values)
    }

    fn labelled(&self) -> Result<Vec<(Value, String)>, CollectionError> {
        Ok(self
            .rows
            .iter()
            .map(|row| {
                let pk = row.get(&self.pk).cloned().unwrap_or(Value::Null);
                let display = row
                    .get(&self.display)
                    .map_or_else(|| value_to_string(&pk), value_to_string);
                (pk, display)
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone)]
struct MemoryModel {
    fields: Vec<FieldMetadata>,
    rows: Vec<Value>,
    pk: String,
    display: String,
}

/// A set of named in-memory models.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    models: BTreeMap<String, MemoryModel>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model keyed by `id` and displayed by `name`
    #[must_use]
    pub fn model(self, name: impl Into<String>, fields: Vec<FieldMetadata>, rows: Vec<Value>) -> Self {
        self.model_with_keys(name, "id", "name", fields, rows)
    }

    #[must_use]
    pub fn model_with_keys(
        mut self,
        name: impl Into<String>,
        pk: impl Into<String>,
        display: impl Into<String>,
        fields: Vec<FieldMetadata>,
        rows: Vec<Value>,
    ) -> Self {
        self.models.insert(
            name.into(),
            MemoryModel {
                fields,
                rows,
                pk: pk.into(),
                display: display.into(),
            },
        );
        self
    }

    fn lookup_model(&self, model: &str) -> Result<&MemoryModel, CollectionError> {
        self.models
            .get(model)
            .ok_or_else(|| CollectionError::UnknownModel(model.to_string()))
    }
}

impl ModelCatalog for MemoryCatalog {
    type Collection = MemoryCollection;

    fn field(&self, model: &str, name: &str) -> Result<FieldMetadata, CollectionError> {
        self.lookup_model(model)?
            .fields
            .iter()
            .find(|field| field.name == name)
            .cloned()
            .ok_or_else(|| CollectionError::UnknownField(format!("{model}.{name}")))
    }

    fn objects(&self, model: &str) -> Result<MemoryCollection, CollectionError> {
        let entry = self.lookup_model(model)?;
        let mut known: Vec<String> = entry.fields.iter().map(|field| field.name.clone()).collect();
        known.push(entry.pk.clone());
        Ok(MemoryCollection::new(entry.rows.clone())
            .with_keys(entry.pk.clone(), entry.display.clone())
            .with_known_fields(known))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldKind, Relation};
    use serde_json::json;

    fn items() -> MemoryCollection {
        MemoryCollection::new(vec![
            json!({"id": 1, "name": "lamp", "color": "red", "category": {"id": 10, "name": "Home"}, "tags": [{"id": 1}]}),
            json!({"id": 2, "name": "desk", "color": "blue", "category": null, "tags": []}),
            json!({"id": 3, "name": "pen", "color": null, "category": {"id": 11, "name": "Office"}, "tags": [{"id": 1}, {"id": 2}]}),
        ])
    }

    #[test]
    fn test_filter_exact_on_relation_path() {
        let filtered = items().filter(&[Lookup::exact("category__id", 10)]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows()[0]["name"], "lamp");
    }

    #[test]
    fn test_filter_isnull() {
        let nulls = items().filter(&[Lookup::is_null("category", true)]).unwrap();
        assert_eq!(nulls.len(), 1);
        let not_nulls = items().filter(&[Lookup::is_null("category", false)]).unwrap();
        assert_eq!(not_nulls.len(), 2);
    }

    #[test]
    fn test_filter_many_relation() {
        let tagged = items().filter(&[Lookup::exact("tags__id", 2)]).unwrap();
        assert_eq!(tagged.len(), 1);
        let untagged = items().filter(&[Lookup::is_null("tags", true)]).unwrap();
        assert_eq!(untagged.rows()[0]["name"], "desk");
    }

    #[test]
    fn test_filter_in() {
        let lookup = Lookup {
            path: vec!["id".to_string()],
            op: LookupOp::In,
            value: json!([1, 3]),
        };
        assert_eq!(items().filter(&[lookup]).unwrap().len(), 2);
    }

    #[test]
    fn test_distinct_values_sorted_with_null() {
        let values = items().distinct_values("color").unwrap();
        assert_eq!(values, vec![Value::Null, json!("blue"), json!("red")]);
    }

    #[test]
    fn test_labelled() {
        let labels = items().labelled().unwrap();
        assert_eq!(labels[0], (json!(1), "lamp".to_string()));
    }

    #[test]
    fn test_known_fields_reject_unknown_lookup() {
        let strict = items().with_known_fields(vec!["id".to_string(), "color".to_string()]);
        assert_eq!(
            strict.filter(&[Lookup::exact("size", "L")]).unwrap_err(),
            CollectionError::UnknownField("size".to_string())
        );
        assert!(strict.exists(&[Lookup::exact("color", "red")]).unwrap());
    }

    #[test]
    fn test_catalog_resolve_path() {
        let catalog = MemoryCatalog::new()
            .model(
                "Item",
                vec![
                    FieldMetadata::new("Item", "category", FieldKind::Integer)
                        .relation(Relation::foreign_key("Category", "id", FieldKind::Integer)),
                ],
                vec![],
            )
            .model(
                "Category",
                vec![FieldMetadata::new("Category", "name", FieldKind::Text)],
                vec![],
            );
        let fields = catalog.resolve_path("Item", "category__name").unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].model, "Category");
        assert!(catalog.resolve_path("Item", "colour").is_err());
        assert!(catalog.resolve_path("Category", "name__length").is_err());
    }
}
