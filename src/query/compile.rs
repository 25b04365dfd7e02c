//! Compile a client [`QueryForm`] into a [`Selection`] over allowed fields only.
//!
//! Every filter and order is resolved through the catalog first and then
//! checked against the descriptor's allow-lists. Anything that fails either
//! step, uses an unknown operator or carries a value that cannot be coerced to
//! the field's kind is dropped without an error.

use crate::config::ObjectDescriptor;
use crate::query::form::{clamp_page, Filter, QueryForm};
use crate::schema::value::coerce;
use crate::schema::{FieldDescriptor, FieldKind};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Between,
}

impl FilterOp {
    pub fn parse(op: &str) -> Option<Self> {
        let op = op.trim();
        Some(match op.to_ascii_lowercase().as_str() {
            "=" | "==" => FilterOp::Eq,
            "<>" | "!=" => FilterOp::Ne,
            "in" => FilterOp::In,
            "not_in" => FilterOp::NotIn,
            ">" => FilterOp::Gt,
            ">=" => FilterOp::Gte,
            "<" => FilterOp::Lt,
            "<=" => FilterOp::Lte,
            "like" => FilterOp::Like,
            "between" => FilterOp::Between,
            _ => return None,
        })
    }
}

/// A comparison with its already-coerced operands.
#[derive(Clone, Debug, PartialEq)]
pub enum Comparison {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    /// Pattern with `%` wildcards already applied.
    Like(String),
    Between(Value, Value),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub column: String,
    pub kind: FieldKind,
    pub comparison: Comparison,
}

/// Keyword search: `pattern` LIKE-matched against any of `columns`.
#[derive(Clone, Debug, PartialEq)]
pub struct Search {
    pub columns: Vec<String>,
    pub pattern: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sort {
    pub column: String,
    pub descending: bool,
}

/// Predicates (ANDed), ordering and page window.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub conditions: Vec<Condition>,
    pub search: Option<Search>,
    pub sorts: Vec<Sort>,
    pub offset: u64,
    pub limit: u64,
}

pub fn compile_query(desc: &ObjectDescriptor, form: &QueryForm) -> Selection {
    let mut conditions = Vec::new();
    for filter in &form.filters {
        let Some(field) = desc.field_by_external(&filter.name) else {
            tracing::debug!(object = %desc.name, filter = %filter.name, "unknown filter field dropped");
            continue;
        };
        if !desc.filterable.contains(&field.internal_name) {
            tracing::debug!(object = %desc.name, filter = %filter.name, "filter field not allowed, dropped");
            continue;
        }
        match compile_filter(field, filter) {
            Some(condition) => conditions.push(condition),
            None => {
                tracing::debug!(object = %desc.name, filter = %filter.name, op = %filter.op, "invalid filter dropped")
            }
        }
    }

    let mut sorts = Vec::new();
    for order in &form.orders {
        let Some(field) = desc.field_by_external(&order.name) else {
            tracing::debug!(object = %desc.name, order = %order.name, "unknown order field dropped");
            continue;
        };
        if !desc.orderable.contains(&field.internal_name) {
            tracing::debug!(object = %desc.name, order = %order.name, "order field not allowed, dropped");
            continue;
        }
        if sorts.iter().any(|s: &Sort| s.column == field.internal_name) {
            continue;
        }
        sorts.push(Sort {
            column: field.internal_name.clone(),
            descending: order.op.trim().eq_ignore_ascii_case("desc"),
        });
    }
    if sorts.is_empty() {
        sorts = desc.default_orders.clone();
    }
    let pk = &desc.primary_key().internal_name;
    if !sorts.iter().any(|s| &s.column == pk) {
        sorts.push(Sort {
            column: pk.clone(),
            descending: false,
        });
    }

    let search = if form.keyword.is_empty() || desc.searchable.is_empty() {
        None
    } else {
        Some(Search {
            columns: desc.searchable.clone(),
            pattern: format!("%{}%", form.keyword),
        })
    };

    let (offset, limit) = clamp_page(form.offset, form.limit);
    Selection {
        conditions,
        search,
        sorts,
        offset,
        limit,
    }
}

/// Server-defined filters (view scopes). Resolved through the catalog but not
/// checked against the filterable allow-list.
pub fn compile_scope(desc: &ObjectDescriptor, scope: &[Filter]) -> Vec<Condition> {
    scope
        .iter()
        .filter_map(|filter| {
            let field = desc.field_by_external(&filter.name)?;
            compile_filter(field, filter)
        })
        .collect()
}

fn compile_filter(field: &FieldDescriptor, filter: &Filter) -> Option<Condition> {
    let op = FilterOp::parse(&filter.op)?;
    let kind = field.kind;
    let scalar = |v: &Value| coerce(kind, v);
    let comparison = match op {
        FilterOp::Eq => Comparison::Eq(scalar(&filter.value)?),
        FilterOp::Ne => Comparison::Ne(scalar(&filter.value)?),
        FilterOp::Gt => Comparison::Gt(scalar(&filter.value)?),
        FilterOp::Gte => Comparison::Gte(scalar(&filter.value)?),
        FilterOp::Lt => Comparison::Lt(scalar(&filter.value)?),
        FilterOp::Lte => Comparison::Lte(scalar(&filter.value)?),
        FilterOp::In => Comparison::In(coerce_list(kind, &filter.value)?),
        FilterOp::NotIn => Comparison::NotIn(coerce_list(kind, &filter.value)?),
        FilterOp::Like => Comparison::Like(format!("%{}%", like_text(&filter.value)?)),
        FilterOp::Between => {
            let range = as_list(&filter.value)?;
            let [low, high] = range.as_slice() else {
                return None;
            };
            Comparison::Between(scalar(low)?, scalar(high)?)
        }
    };
    Some(Condition {
        column: field.internal_name.clone(),
        kind,
        comparison,
    })
}

/// An array, or a string holding a JSON array.
fn as_list(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_list(kind: FieldKind, value: &Value) -> Option<Vec<Value>> {
    let items = as_list(value)?;
    if items.is_empty() {
        return None;
    }
    items.iter().map(|v| coerce(kind, v)).collect()
}

fn like_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_object, ObjectConfig};
    use crate::query::form::{Order, DEFAULT_QUERY_LIMIT};
    use crate::schema::{Catalog, Member, MemberType, Shape};
    use serde_json::json;
    use std::sync::Arc;

    fn descriptor(config: ObjectConfig) -> ObjectDescriptor {
        let shape = Shape::new("User")
            .member(Member::new("id", MemberType::Integer).primary_key())
            .member(Member::new("name", MemberType::String))
            .member(Member::new("email", MemberType::String))
            .member(Member::new("age", MemberType::Integer))
            .member(Member::new("enabled", MemberType::Boolean))
            .member(Member::new("createdAt", MemberType::DateTime))
            .member(Member::new("secret", MemberType::String));
        resolve_object(&config, Arc::new(Catalog::extract(&shape).unwrap())).unwrap()
    }

    fn open() -> ObjectDescriptor {
        descriptor(
            ObjectConfig::named("user")
                .filterables(["name", "age", "enabled", "createdAt"])
                .orderables(["name", "age"])
                .searchables(["name", "email"]),
        )
    }

    fn form(filters: Vec<Filter>) -> QueryForm {
        QueryForm {
            filters,
            ..Default::default()
        }
    }

    #[test]
    fn filters_outside_allow_list_are_dropped() {
        let desc = open();
        let sel = compile_query(
            &desc,
            &form(vec![
                Filter::new("secret", "=", json!("x")),
                Filter::new("nope", "=", json!("x")),
                Filter::new("name", "=", json!("bob")),
            ]),
        );
        assert_eq!(
            sel.conditions,
            vec![Condition {
                column: "name".into(),
                kind: FieldKind::String,
                comparison: Comparison::Eq(json!("bob")),
            }]
        );
    }

    #[test]
    fn empty_filterable_list_allows_nothing() {
        let desc = descriptor(ObjectConfig::named("user"));
        let sel = compile_query(&desc, &form(vec![Filter::new("name", "=", json!("bob"))]));
        assert!(sel.conditions.is_empty());
    }

    #[test]
    fn values_are_coerced_or_dropped() {
        let desc = open();
        let sel = compile_query(
            &desc,
            &form(vec![
                Filter::new("age", ">=", json!("10")),
                Filter::new("enabled", "=", json!("yes")),
                Filter::new("age", "<", json!("old")),
                Filter::new("age", "~", json!(1)),
                Filter::new("createdAt", "<", json!("2024-01-01")),
            ]),
        );
        let comparisons: Vec<_> = sel.conditions.iter().map(|c| c.comparison.clone()).collect();
        assert_eq!(
            comparisons,
            vec![
                Comparison::Gte(json!(10)),
                Comparison::Eq(json!(true)),
                Comparison::Lt(json!("2024-01-01T00:00:00Z")),
            ]
        );
        assert_eq!(sel.conditions[2].column, "created_at");
    }

    #[test]
    fn list_operators_accept_arrays_and_json_strings() {
        let desc = open();
        let sel = compile_query(
            &desc,
            &form(vec![
                Filter::new("age", "in", json!([1, "2"])),
                Filter::new("age", "not_in", json!("[3, 4]")),
                Filter::new("age", "in", json!([])),
                Filter::new("age", "in", json!(5)),
                Filter::new("age", "between", json!([18, 30])),
                Filter::new("age", "between", json!([18])),
            ]),
        );
        let comparisons: Vec<_> = sel.conditions.iter().map(|c| c.comparison.clone()).collect();
        assert_eq!(
            comparisons,
            vec![
                Comparison::In(vec![json!(1), json!(2)]),
                Comparison::NotIn(vec![json!(3), json!(4)]),
                Comparison::Between(json!(18), json!(30)),
            ]
        );
    }

    #[test]
    fn like_wraps_value_without_interpolation() {
        let desc = open();
        let sel = compile_query(
            &desc,
            &form(vec![Filter::new("name", "like", json!("a'; DROP TABLE user; --"))]),
        );
        assert_eq!(
            sel.conditions[0].comparison,
            Comparison::Like("%a'; DROP TABLE user; --%".into())
        );
    }

    #[test]
    fn orders_respect_allow_list_and_end_with_primary_key() {
        let desc = open();
        let sel = compile_query(
            &desc,
            &QueryForm {
                orders: vec![Order::desc("age"), Order::asc("secret"), Order::asc("bogus")],
                ..Default::default()
            },
        );
        assert_eq!(
            sel.sorts,
            vec![
                Sort {
                    column: "age".into(),
                    descending: true
                },
                Sort {
                    column: "id".into(),
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn default_orders_apply_without_accepted_order() {
        let desc = descriptor(
            ObjectConfig::named("user").default_orders(vec![Order::desc("createdAt")]),
        );
        let sel = compile_query(&desc, &QueryForm::default());
        assert_eq!(sel.sorts.len(), 2);
        assert_eq!(sel.sorts[0].column, "created_at");
        assert!(sel.sorts[0].descending);
        assert_eq!(sel.sorts[1].column, "id");
    }

    #[test]
    fn keyword_needs_searchable_fields() {
        let desc = open();
        let sel = compile_query(
            &desc,
            &QueryForm {
                keyword: "bo".into(),
                ..Default::default()
            },
        );
        assert_eq!(
            sel.search,
            Some(Search {
                columns: vec!["name".into(), "email".into()],
                pattern: "%bo%".into(),
            })
        );

        let closed = descriptor(ObjectConfig::named("user"));
        let sel = compile_query(
            &closed,
            &QueryForm {
                keyword: "bo".into(),
                ..Default::default()
            },
        );
        assert_eq!(sel.search, None);
    }

    #[test]
    fn pagination_is_clamped() {
        let desc = open();
        let sel = compile_query(
            &desc,
            &QueryForm {
                offset: -5,
                limit: 1000,
                ..Default::default()
            },
        );
        assert_eq!((sel.offset, sel.limit), (0, DEFAULT_QUERY_LIMIT));
    }

    #[test]
    fn scope_bypasses_filterable_but_not_catalog() {
        let desc = descriptor(ObjectConfig::named("user"));
        let conditions = compile_scope(
            &desc,
            &[
                Filter::new("secret", "=", json!("s")),
                Filter::new("ghost", "=", json!("g")),
            ],
        );
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].column, "secret");
    }
}
