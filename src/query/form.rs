//! Wire types of the query endpoint.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Page size used when the client asks for none, zero, a negative size or more than this.
pub const DEFAULT_QUERY_LIMIT: u64 = 50;

/// Treat an explicit `null` like a missing member.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    /// One of `=`, `<>`, `in`, `not_in`, `>`, `>=`, `<`, `<=`, `like`, `between`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub op: String,
    #[serde(default)]
    pub value: Value,
}

impl Filter {
    pub fn new(name: impl Into<String>, op: impl Into<String>, value: Value) -> Self {
        Filter {
            name: name.into(),
            op: op.into(),
            value,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub name: String,
    /// `asc` (default) or `desc`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub op: String,
}

impl Order {
    pub fn asc(name: impl Into<String>) -> Self {
        Order {
            name: name.into(),
            op: "asc".into(),
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Order {
            name: name.into(),
            op: "desc".into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryForm {
    #[serde(default, alias = "pos", deserialize_with = "null_as_default")]
    pub offset: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub limit: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keyword: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: Vec<Filter>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub orders: Vec<Order>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryResult<T> {
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub keyword: String,
    pub items: Vec<T>,
}

/// Clamp client pagination: negative offset becomes 0, limit lands in `(0, DEFAULT_QUERY_LIMIT]`.
pub fn clamp_page(offset: i64, limit: i64) -> (u64, u64) {
    let offset = offset.max(0) as u64;
    let limit = if limit <= 0 || limit as u64 > DEFAULT_QUERY_LIMIT {
        DEFAULT_QUERY_LIMIT
    } else {
        limit as u64
    };
    (offset, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn form_tolerates_nulls_and_pos_alias() {
        let form: QueryForm = serde_json::from_value(json!({
            "pos": 20,
            "limit": 5,
            "keyword": null,
            "filters": null,
            "orders": [{"name": "age", "op": "desc"}]
        }))
        .unwrap();
        assert_eq!(form.offset, 20);
        assert_eq!(form.limit, 5);
        assert!(form.keyword.is_empty());
        assert!(form.filters.is_empty());
        assert_eq!(form.orders, vec![Order::desc("age")]);

        let empty: QueryForm = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, QueryForm::default());
    }

    #[test]
    fn filter_value_keeps_json_type() {
        let f: Filter = serde_json::from_value(json!({"name": "age", "op": "in", "value": [1, 2]})).unwrap();
        assert_eq!(f.value, json!([1, 2]));
    }

    #[test]
    fn page_is_clamped() {
        assert_eq!(clamp_page(-3, 0), (0, DEFAULT_QUERY_LIMIT));
        assert_eq!(clamp_page(0, -1), (0, DEFAULT_QUERY_LIMIT));
        assert_eq!(clamp_page(0, 51), (0, DEFAULT_QUERY_LIMIT));
        assert_eq!(clamp_page(10, 50), (10, 50));
        assert_eq!(clamp_page(10, 1), (10, 1));
    }

    #[test]
    fn result_omits_empty_keyword() {
        let r: QueryResult<u8> = QueryResult {
            total: 0,
            offset: 0,
            limit: 50,
            keyword: String::new(),
            items: vec![],
        };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"total": 0, "offset": 0, "limit": 50, "items": []})
        );
    }
}
