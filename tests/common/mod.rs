#![allow(dead_code)]

use listview_filters::{
    Choice, CollectionError, Declaration, FieldKind, FieldMetadata, ListFilter, ListView, Lookup, LookupParams,
    MemoryCatalog, MemoryCollection, ModelCatalog, PreparedValue, QueryString, Relation,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub fn item_fields() -> Vec<FieldMetadata> {
    vec![
        FieldMetadata::new("Item", "color", FieldKind::Text)
            .verbose_name("Color")
            .choices([(json!("red"), "Red"), (json!("blue"), "Blue")]),
        FieldMetadata::new("Item", "category", FieldKind::Integer)
            .verbose_name("Category")
            .nullable()
            .relation(Relation::foreign_key("Category", "id", FieldKind::Integer)),
        FieldMetadata::new("Item", "size", FieldKind::Text).nullable(),
        FieldMetadata::new("Item", "status", FieldKind::Text)
            .verbose_name("Status")
            .choices([(json!("open"), "Open"), (json!("closed"), "Closed")]),
        FieldMetadata::new("Item", "tags", FieldKind::Integer)
            .verbose_name("Tags")
            .relation(Relation::many_to_many("Tag", "id", FieldKind::Integer)),
        FieldMetadata::new("Item", "price", FieldKind::Integer).verbose_name("Price"),
    ]
}

pub fn item_rows() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "lamp", "color": "red", "category": {"id": 1, "name": "Home"},
               "size": "S", "status": "open", "tags": [{"id": 1}], "price": 10}),
        json!({"id": 2, "name": "desk", "color": "blue", "category": {"id": 2, "name": "Office"},
               "size": "L", "status": "closed", "tags": [], "price": 20}),
        json!({"id": 3, "name": "pen", "color": "red", "category": null,
               "size": null, "status": "open", "tags": [{"id": 1}, {"id": 2}], "price": 5}),
    ]
}

/// Items with categories (one unused), and tags
pub fn catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .model("Item", item_fields(), item_rows())
        .model(
            "Category",
            vec![FieldMetadata::new("Category", "name", FieldKind::Text)],
            vec![
                json!({"id": 1, "name": "Home"}),
                json!({"id": 2, "name": "Office"}),
                json!({"id": 3, "name": "Garden"}),
            ],
        )
        .model(
            "Tag",
            vec![FieldMetadata::new("Tag", "name", FieldKind::Text)],
            vec![json!({"id": 1, "name": "new"}), json!({"id": 2, "name": "sale"})],
        )
}

/// Color, category and size filters on items
pub fn item_view() -> ListView<MemoryCatalog> {
    ListView::new("Item")
        .filter(Declaration::field("color"))
        .filter(Declaration::field("category"))
        .filter(Declaration::field("size"))
}

/// A catalog whose `broken` model cannot be loaded
#[derive(Debug, Clone)]
pub struct FailingCatalog {
    pub inner: MemoryCatalog,
    pub broken: &'static str,
}

impl ModelCatalog for FailingCatalog {
    type Collection = MemoryCollection;

    fn field(&self, model: &str, name: &str) -> Result<FieldMetadata, CollectionError> {
        self.inner.field(model, name)
    }

    fn objects(&self, model: &str) -> Result<MemoryCollection, CollectionError> {
        if model == self.broken {
            return Err(CollectionError::Query("connection reset".to_string()));
        }
        self.inner.objects(model)
    }
}

/// Yes/no filter on whether an item has a category, claiming `has_category`
#[derive(Debug, Clone)]
pub struct HasCategoryFilter {
    pub title: String,
    pub value: Option<String>,
    pub used_parameters: BTreeMap<String, PreparedValue>,
}

impl HasCategoryFilter {
    pub const PARAMETER: &'static str = "has_category";

    pub fn build(title: &str, mut params: LookupParams) -> (Self, LookupParams) {
        let value = params.remove(Self::PARAMETER);
        let used_parameters = value
            .iter()
            .map(|raw| (Self::PARAMETER.to_string(), PreparedValue::Text(raw.clone())))
            .collect();
        (
            Self {
                title: title.to_string(),
                value,
                used_parameters,
            },
            params,
        )
    }
}

impl ListFilter for HasCategoryFilter {
    fn title(&self) -> &str {
        &self.title
    }

    fn expected_parameters(&self) -> Vec<String> {
        vec![Self::PARAMETER.to_string()]
    }

    fn used_parameters(&self) -> &BTreeMap<String, PreparedValue> {
        &self.used_parameters
    }

    fn has_output(&self) -> bool {
        true
    }

    fn lookups(&self) -> Result<Vec<Lookup>, listview_filters::FilterError> {
        Ok(match self.value.as_deref() {
            Some("yes") => vec![Lookup::is_null("category", false)],
            Some("no") => vec![Lookup::is_null("category", true)],
            _ => Vec::new(),
        })
    }

    fn choices(&self, query: &QueryString) -> Vec<Choice> {
        let mut choices = vec![Choice {
            selected: self.value.is_none(),
            query_string: query.remove_exact(&[Self::PARAMETER]).url(),
            display: "All".to_string(),
        }];
        for (value, display) in [("yes", "Yes"), ("no", "No")] {
            choices.push(Choice {
                selected: self.value.as_deref() == Some(value),
                query_string: query.set(Self::PARAMETER, Some(value)).url(),
                display: display.to_string(),
            });
        }
        choices
    }
}

/// Titles and selection flags, for compact assertions
pub fn selection(choices: &[Choice]) -> Vec<(&str, bool)> {
    choices
        .iter()
        .map(|choice| (choice.display.as_str(), choice.selected))
        .collect()
}

pub fn query(full_path: &str) -> QueryString {
    QueryString::parse(full_path)
}
