//! Lookups as sea-orm conditions, for collections backed by a database.
//!
//! The in-memory collection evaluates lookups itself. A database adapter turns
//! them into a [`Condition`] instead and hands it to `Select::filter`.

use sea_orm::sea_query::{Alias, Expr, SimpleExpr};
use sea_orm::Condition;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::errors::FilterError;
use crate::lookup::{LOOKUP_SEP, Lookup, LookupOp};

/// Column for a lookup path: the last segment is the column, the one before it
/// (if any) the table.
#[must_use]
pub fn default_column(path: &[String]) -> Option<Expr> {
    match path {
        [] => None,
        [column] => Some(Expr::col(Alias::new(column))),
        [.., table, column] => Some(Expr::col((Alias::new(table), Alias::new(column)))),
    }
}

/// Scalar JSON value as a bound query value. Strings holding a UUID bind as one.
#[must_use]
pub fn json_to_value(value: &JsonValue) -> Option<sea_orm::Value> {
    match value {
        JsonValue::Bool(flag) => Some((*flag).into()),
        JsonValue::Number(number) => number
            .as_i64()
            .map(sea_orm::Value::from)
            .or_else(|| number.as_f64().map(sea_orm::Value::from)),
        JsonValue::String(text) => Some(match Uuid::parse_str(text) {
            Ok(uuid) => uuid.into(),
            Err(_) => text.clone().into(),
        }),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

fn invalid(lookup: &Lookup, reason: &str) -> FilterError {
    FilterError::invalid_lookup(
        format!("{}{LOOKUP_SEP}{}", lookup.path.join(LOOKUP_SEP), lookup.op.suffix()),
        reason,
    )
}

/// Expression for one lookup against `column`.
///
/// # Errors
///
/// Values that cannot be bound are an invalid lookup.
pub fn lookup_expr(lookup: &Lookup, column: Expr) -> Result<SimpleExpr, FilterError> {
    match lookup.op {
        LookupOp::IsNull => match lookup.value.as_bool() {
            Some(true) => Ok(column.is_null()),
            Some(false) => Ok(column.is_not_null()),
            None => Err(invalid(lookup, "value must be either True or False")),
        },
        LookupOp::Exact if lookup.value.is_null() => Ok(column.is_null()),
        LookupOp::Exact => json_to_value(&lookup.value)
            .map(|value| column.eq(value))
            .ok_or_else(|| invalid(lookup, "value is not a scalar")),
        LookupOp::In => {
            let items = match &lookup.value {
                JsonValue::Array(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            let values = items
                .iter()
                .map(|item| json_to_value(item).ok_or_else(|| invalid(lookup, "list holds a non-scalar value")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(column.is_in(values))
        }
    }
}

/// All lookups joined with AND. `column` maps a lookup path to its column.
///
/// # Errors
///
/// A path `column` does not know, or a value that cannot be bound, is an
/// invalid lookup.
pub fn lookups_condition<F>(lookups: &[Lookup], column: F) -> Result<Condition, FilterError>
where
    F: Fn(&[String]) -> Option<Expr>,
{
    lookups.iter().try_fold(Condition::all(), |condition, lookup| {
        let target = column(&lookup.path).ok_or_else(|| invalid(lookup, "unknown field"))?;
        Ok(condition.add(lookup_expr(lookup, target)?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbBackend;
    use sea_orm::sea_query::{Asterisk, Query};
    use serde_json::json;

    fn render(condition: Condition) -> String {
        let mut query = Query::select();
        query
            .column(Asterisk)
            .from(Alias::new("item"))
            .cond_where(condition);
        DbBackend::Sqlite.build(&query).to_string()
    }

    #[test]
    fn test_exact_and_isnull() {
        let condition = lookups_condition(
            &[
                Lookup::exact("status", "open"),
                Lookup::is_null("category", true),
            ],
            default_column,
        )
        .unwrap();
        let sql = render(condition);
        assert!(sql.contains(r#""status" = 'open'"#), "{sql}");
        assert!(sql.contains(r#""category" IS NULL"#), "{sql}");
        assert!(sql.contains(" AND "), "{sql}");
    }

    #[test]
    fn test_relation_path_uses_table_column() {
        let condition = lookups_condition(&[Lookup::exact("category__id", 10)], default_column).unwrap();
        let sql = render(condition);
        assert!(sql.contains(r#""category"."id" = 10"#), "{sql}");
    }

    #[test]
    fn test_in_lookup() {
        let lookup = Lookup {
            path: vec!["id".to_string()],
            op: LookupOp::In,
            value: json!([1, 3]),
        };
        let sql = render(lookups_condition(&[lookup], default_column).unwrap());
        assert!(sql.contains(r#""id" IN (1, 3)"#), "{sql}");
    }

    #[test]
    fn test_not_null() {
        let sql = render(lookups_condition(&[Lookup::is_null("category", false)], default_column).unwrap());
        assert!(sql.contains(r#""category" IS NOT NULL"#), "{sql}");
    }

    #[test]
    fn test_unknown_column_is_invalid_lookup() {
        let err = lookups_condition(&[Lookup::exact("size", "L")], |_| None).unwrap_err();
        assert!(matches!(err, FilterError::InvalidLookup { ref parameter, .. } if parameter == "size__exact"));
    }

    #[test]
    fn test_object_value_is_rejected() {
        let lookup = Lookup::exact("status", json!({"nested": true}));
        assert!(lookups_condition(&[lookup], default_column).is_err());
    }

    #[test]
    fn test_uuid_strings_bind_as_uuid() {
        let value = json_to_value(&json!("550e8400-e29b-41d4-a716-446655440000")).unwrap();
        assert!(matches!(value, sea_orm::Value::Uuid(Some(_))));
        assert!(matches!(json_to_value(&json!("red")), Some(sea_orm::Value::String(Some(_)))));
    }
}
