//! In-process storage evaluating selections directly. Used by tests and local runs.

use crate::config::ObjectDescriptor;
use crate::query::{Comparison, Condition, Selection, Sort};
use crate::schema::value::parse_datetime;
use crate::schema::FieldKind;
use crate::store::{is_unset_key, Row, Store, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Table {
    rows: Vec<Row>,
    last_id: i64,
}

/// Tables keyed by name. The lock is never held across an await point.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Table>>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Table>>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn matching(&self, desc: &ObjectDescriptor, selection: &Selection) -> Result<Vec<Row>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .get(&desc.table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|row| matches(row, selection))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }

    async fn count(&self, desc: &ObjectDescriptor, selection: &Selection) -> Result<u64, StoreError> {
        Ok(self.matching(desc, selection)?.len() as u64)
    }

    async fn fetch(&self, desc: &ObjectDescriptor, selection: &Selection) -> Result<Vec<Row>, StoreError> {
        let mut rows = self.matching(desc, selection)?;
        rows.sort_by(|a, b| compare_rows(desc, a, b, &selection.sorts));
        Ok(rows
            .into_iter()
            .skip(selection.offset as usize)
            .take(selection.limit as usize)
            .collect())
    }

    async fn find_one(&self, desc: &ObjectDescriptor, key: &Value) -> Result<Option<Row>, StoreError> {
        let pk = &desc.primary_key().internal_name;
        let tables = self.read()?;
        Ok(tables.get(&desc.table).and_then(|t| {
            t.rows
                .iter()
                .find(|row| key_matches(row.get(pk), key))
                .cloned()
        }))
    }

    async fn insert(&self, desc: &ObjectDescriptor, row: &Row) -> Result<Row, StoreError> {
        let pk = desc.primary_key();
        let mut tables = self.write()?;
        let table = tables.entry(desc.table.clone()).or_default();

        let mut stored = Row::new();
        for field in desc.catalog.fields() {
            let value = row.get(&field.internal_name).cloned().unwrap_or(Value::Null);
            stored.insert(field.internal_name.clone(), value);
        }

        if is_unset_key(stored.get(&pk.internal_name)) {
            if pk.kind != FieldKind::Integer {
                return Err(StoreError::Conflict(format!(
                    "{}: primary key '{}' required",
                    desc.table, pk.external_name
                )));
            }
            table.last_id += 1;
            stored.insert(pk.internal_name.clone(), Value::from(table.last_id));
        } else {
            let key = stored.get(&pk.internal_name).cloned().unwrap_or(Value::Null);
            if table
                .rows
                .iter()
                .any(|r| key_matches(r.get(&pk.internal_name), &key))
            {
                return Err(StoreError::Conflict(format!("{}: duplicate key {}", desc.table, key)));
            }
            if let Some(id) = key.as_i64() {
                table.last_id = table.last_id.max(id);
            }
        }
        table.rows.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, desc: &ObjectDescriptor, key: &Value, changes: &Row) -> Result<u64, StoreError> {
        let pk = &desc.primary_key().internal_name;
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(&desc.table) else {
            return Ok(0);
        };
        let mut affected = 0;
        for row in table.rows.iter_mut().filter(|r| key_matches(r.get(pk), key)) {
            for (column, value) in changes {
                if column != pk {
                    row.insert(column.clone(), value.clone());
                }
            }
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, desc: &ObjectDescriptor, key: &Value) -> Result<u64, StoreError> {
        self.delete_many(desc, std::slice::from_ref(key)).await
    }

    async fn delete_many(&self, desc: &ObjectDescriptor, keys: &[Value]) -> Result<u64, StoreError> {
        let pk = &desc.primary_key().internal_name;
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(&desc.table) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table
            .rows
            .retain(|row| !keys.iter().any(|key| key_matches(row.get(pk), key)));
        Ok((before - table.rows.len()) as u64)
    }
}

fn key_matches(cell: Option<&Value>, key: &Value) -> bool {
    cell.map(|c| compare(FieldKind::String, c, key) == Some(Ordering::Equal))
        .unwrap_or(false)
}

fn matches(row: &Row, selection: &Selection) -> bool {
    let filtered = selection.conditions.iter().all(|c| holds(row, c));
    let searched = match &selection.search {
        None => true,
        Some(search) => search.columns.iter().any(|column| {
            text_of(row.get(column))
                .map(|text| like(&text, &search.pattern))
                .unwrap_or(false)
        }),
    };
    filtered && searched
}

/// SQL three-valued logic collapsed to false: any comparison against NULL fails.
fn holds(row: &Row, condition: &Condition) -> bool {
    let cell = row.get(&condition.column).unwrap_or(&Value::Null);
    let cmp = |v: &Value| compare(condition.kind, cell, v);
    match &condition.comparison {
        Comparison::Eq(v) => cmp(v) == Some(Ordering::Equal),
        Comparison::Ne(v) => matches!(cmp(v), Some(o) if o != Ordering::Equal),
        Comparison::Gt(v) => cmp(v) == Some(Ordering::Greater),
        Comparison::Gte(v) => matches!(cmp(v), Some(Ordering::Greater | Ordering::Equal)),
        Comparison::Lt(v) => cmp(v) == Some(Ordering::Less),
        Comparison::Lte(v) => matches!(cmp(v), Some(Ordering::Less | Ordering::Equal)),
        Comparison::In(vs) => vs.iter().any(|v| cmp(v) == Some(Ordering::Equal)),
        Comparison::NotIn(vs) => vs
            .iter()
            .all(|v| matches!(cmp(v), Some(o) if o != Ordering::Equal)),
        Comparison::Like(pattern) => text_of(Some(cell))
            .map(|text| like(&text, pattern))
            .unwrap_or(false),
        Comparison::Between(low, high) => {
            matches!(cmp(low), Some(Ordering::Greater | Ordering::Equal))
                && matches!(cmp(high), Some(Ordering::Less | Ordering::Equal))
        }
    }
}

fn compare(kind: FieldKind, a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) if kind == FieldKind::DateTime => {
            match (parse_datetime(x), parse_datetime(y)) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        // keys arrive coerced, but rows inserted from typed records may differ in representation
        (Value::Number(n), Value::String(s)) => s.parse::<f64>().ok()?.partial_cmp(&n.as_f64()?).map(Ordering::reverse),
        (Value::String(s), Value::Number(n)) => s.parse::<f64>().ok()?.partial_cmp(&n.as_f64()?),
        _ => None,
    }
}

/// Ascending puts NULLs last, like PostgreSQL.
fn compare_rows(desc: &ObjectDescriptor, a: &Row, b: &Row, sorts: &[Sort]) -> Ordering {
    for sort in sorts {
        let kind = desc
            .field_by_internal(&sort.column)
            .map(|f| f.kind)
            .unwrap_or(FieldKind::String);
        let x = a.get(&sort.column).unwrap_or(&Value::Null);
        let y = b.get(&sort.column).unwrap_or(&Value::Null);
        let ordering = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare(kind, x, y).unwrap_or(Ordering::Equal),
        };
        let ordering = if sort.descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Text form used by LIKE, mirroring a `::text` cast.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// One element of a compiled LIKE pattern.
#[derive(Clone, Copy, PartialEq)]
enum Token {
    Any,
    One,
    Lit(char),
}

/// Case-sensitive LIKE: `%` matches any run, `_` any single character and
/// `\` escapes the next character, as in PostgreSQL. A trailing `\` matches itself.
fn like(text: &str, pattern: &str) -> bool {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Lit(chars.next().unwrap_or('\\')),
            c => Token::Lit(c),
        });
    }
    let text: Vec<char> = text.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match tokens.get(p) {
            Some(Token::One) => {
                t += 1;
                p += 1;
            }
            Some(Token::Lit(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            Some(Token::Any) => {
                backtrack = Some((p, t));
                p += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    tokens[p..].iter().all(|&token| token == Token::Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_object, ObjectConfig};
    use crate::query::{compile_query, Filter, Order, QueryForm};
    use crate::schema::{Catalog, Member, MemberType, Shape};
    use serde_json::json;
    use std::sync::Arc;

    fn descriptor() -> ObjectDescriptor {
        let shape = Shape::new("Item")
            .member(Member::new("id", MemberType::Integer).primary_key())
            .member(Member::new("name", MemberType::String))
            .member(Member::new("price", MemberType::optional(MemberType::Float)));
        let config = ObjectConfig::named("item")
            .filterables(["name", "price"])
            .orderables(["price"])
            .searchables(["name"]);
        resolve_object(&config, Arc::new(Catalog::extract(&shape).unwrap())).unwrap()
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    async fn seeded() -> (MemoryStore, ObjectDescriptor) {
        let store = MemoryStore::new();
        let desc = descriptor();
        for (name, price) in [("apple", json!(1.5)), ("banana", json!(0.5)), ("cherry", json!(null))] {
            store
                .insert(&desc, &row(json!({"name": name, "price": price})))
                .await
                .unwrap();
        }
        (store, desc)
    }

    #[test]
    fn like_matches_wildcards() {
        assert!(like("banana", "%nan%"));
        assert!(like("banana", "b_n%"));
        assert!(like("banana", "%"));
        assert!(like("", "%%"));
        assert!(!like("banana", "%NAN%"));
        assert!(!like("banana", "b_n"));
        assert!(like("a%b", "a%b"));
    }

    #[test]
    fn like_honors_backslash_escapes() {
        assert!(like("a%b", "a\\%b"));
        assert!(!like("axb", "a\\%b"));
        assert!(like("a_b", "a\\_b"));
        assert!(!like("acb", "a\\_b"));
        assert!(like("a\\b", "a\\\\b"));
        assert!(like("ab", "a\\b"));
        assert!(like("a\\", "a\\"));
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let (store, desc) = seeded().await;
        let found = store.find_one(&desc, &json!(2)).await.unwrap().unwrap();
        assert_eq!(found.get("name"), Some(&json!("banana")));
        let dup = store.insert(&desc, &row(json!({"id": 2, "name": "dup"}))).await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
        let next = store.insert(&desc, &row(json!({"name": "date"}))).await.unwrap();
        assert_eq!(next.get("id"), Some(&json!(4)));
    }

    #[tokio::test]
    async fn selection_filters_orders_and_pages() {
        let (store, desc) = seeded().await;
        let form = QueryForm {
            filters: vec![Filter::new("price", ">", json!(0))],
            orders: vec![Order::asc("price")],
            ..Default::default()
        };
        let sel = compile_query(&desc, &form);
        assert_eq!(store.count(&desc, &sel).await.unwrap(), 2);
        let rows = store.fetch(&desc, &sel).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, [json!("banana"), json!("apple")]);

        let desc_order = QueryForm {
            orders: vec![Order::desc("price")],
            limit: 2,
            ..Default::default()
        };
        let rows = store.fetch(&desc, &compile_query(&desc, &desc_order)).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, [json!("cherry"), json!("apple")]);
    }

    #[tokio::test]
    async fn null_never_satisfies_comparisons() {
        let (store, desc) = seeded().await;
        let form = QueryForm {
            filters: vec![Filter::new("price", "<>", json!(1.5))],
            ..Default::default()
        };
        let rows = store.fetch(&desc, &compile_query(&desc, &form)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("banana"));
    }

    #[tokio::test]
    async fn keyword_search_is_case_sensitive() {
        let (store, desc) = seeded().await;
        let form = QueryForm {
            keyword: "an".into(),
            ..Default::default()
        };
        assert_eq!(store.count(&desc, &compile_query(&desc, &form)).await.unwrap(), 1);
        let form = QueryForm {
            keyword: "AN".into(),
            ..Default::default()
        };
        assert_eq!(store.count(&desc, &compile_query(&desc, &form)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_and_delete_report_affected_rows() {
        let (store, desc) = seeded().await;
        let changes = row(json!({"name": "apricot", "id": 99}));
        assert_eq!(store.update(&desc, &json!(1), &changes).await.unwrap(), 1);
        let found = store.find_one(&desc, &json!(1)).await.unwrap().unwrap();
        assert_eq!(found["name"], json!("apricot"));
        assert_eq!(found["id"], json!(1));
        assert_eq!(store.update(&desc, &json!(42), &changes).await.unwrap(), 0);

        assert_eq!(store.delete(&desc, &json!(1)).await.unwrap(), 1);
        assert_eq!(store.delete(&desc, &json!(1)).await.unwrap(), 0);
        assert_eq!(store.delete_many(&desc, &[json!(2), json!(3), json!(7)]).await.unwrap(), 2);
        assert_eq!(store.count(&desc, &compile_query(&desc, &QueryForm::default())).await.unwrap(), 0);
    }
}
