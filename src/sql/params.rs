//! Convert JSON values to types that sqlx can bind.

use crate::schema::FieldKind;
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value bound to a PostgreSQL statement. Each variant binds with its own
/// SQL type; placeholders carry a cast to the column type.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    Json(Value),
}

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else if let Some(f) = n.as_f64() {
                    BindValue::F64(f)
                } else {
                    BindValue::Text(n.to_string())
                }
            }
            Value::String(s) => BindValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Json(v.clone()),
        }
    }

    /// Bind form of a value written to a column of `kind`. Structured kinds
    /// always go through JSON so strings and numbers land as jsonb scalars.
    pub fn for_column(kind: FieldKind, v: &Value) -> Self {
        match (kind, v) {
            (_, Value::Null) => BindValue::Null,
            (k, _) if k.is_structured() => BindValue::Json(v.clone()),
            _ => BindValue::from_json(v),
        }
    }
}

/// Bind every parameter in order.
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [BindValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            BindValue::Null => query.bind(None::<String>),
            BindValue::Bool(b) => query.bind(*b),
            BindValue::I64(n) => query.bind(*n),
            BindValue::F64(n) => query.bind(*n),
            BindValue::Text(s) => query.bind(s.as_str()),
            BindValue::Json(v) => query.bind(sqlx::types::Json(v)),
        };
    }
    query
}
