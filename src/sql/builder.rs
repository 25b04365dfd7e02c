//! Builds parameterized SELECT, COUNT, INSERT, UPDATE and DELETE statements.
//!
//! Identifiers come from descriptors only and are always quoted; every value
//! becomes a `$n` parameter with a cast to the column's kind.

use crate::config::ObjectDescriptor;
use crate::query::{Comparison, Condition, Selection};
use crate::schema::{FieldKind, Row};
use crate::sql::params::BindValue;
use crate::store::is_unset_key;
use serde_json::Value;

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Table name, quoting each part of an optional `schema.table`.
pub fn qualified_table(table: &str) -> String {
    table.split('.').map(quoted).collect::<Vec<_>>().join(".")
}

/// PostgreSQL type a value of `kind` is cast to.
pub fn cast(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String => "text",
        FieldKind::Integer => "bigint",
        FieldKind::Float => "double precision",
        FieldKind::Boolean => "boolean",
        FieldKind::DateTime => "timestamptz",
        FieldKind::Object | FieldKind::Array | FieldKind::Map => "jsonb",
    }
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: BindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// `$n::cast` for a value compared with or written to a column of `kind`.
    fn placeholder(&mut self, kind: FieldKind, v: &Value) -> String {
        let n = self.push_param(BindValue::for_column(kind, v));
        format!("${}::{}", n, cast(kind))
    }
}

fn select_column_list(desc: &ObjectDescriptor) -> String {
    desc.catalog
        .fields()
        .iter()
        .map(|f| quoted(&f.internal_name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn condition_sql(q: &mut QueryBuf, condition: &Condition) -> String {
    let col = quoted(&condition.column);
    let kind = condition.kind;
    let binary = |op: &str, v: &Value, q: &mut QueryBuf| format!("{} {} {}", col, op, q.placeholder(kind, v));
    match &condition.comparison {
        Comparison::Eq(v) => binary("=", v, q),
        Comparison::Ne(v) => binary("<>", v, q),
        Comparison::Gt(v) => binary(">", v, q),
        Comparison::Gte(v) => binary(">=", v, q),
        Comparison::Lt(v) => binary("<", v, q),
        Comparison::Lte(v) => binary("<=", v, q),
        Comparison::In(vs) | Comparison::NotIn(vs) => {
            let list = vs
                .iter()
                .map(|v| q.placeholder(kind, v))
                .collect::<Vec<_>>()
                .join(", ");
            let op = if matches!(condition.comparison, Comparison::In(_)) {
                "IN"
            } else {
                "NOT IN"
            };
            format!("{} {} ({})", col, op, list)
        }
        Comparison::Like(pattern) => {
            let n = q.push_param(BindValue::Text(pattern.clone()));
            format!("{}::text LIKE ${}", col, n)
        }
        Comparison::Between(low, high) => {
            let low = q.placeholder(kind, low);
            let high = q.placeholder(kind, high);
            format!("{} BETWEEN {} AND {}", col, low, high)
        }
    }
}

/// ` WHERE ...` for the selection's predicates, or an empty string.
fn where_clause(q: &mut QueryBuf, selection: &Selection) -> String {
    let mut parts: Vec<String> = selection
        .conditions
        .iter()
        .map(|c| condition_sql(q, c))
        .collect();
    if let Some(search) = &selection.search {
        let n = q.push_param(BindValue::Text(search.pattern.clone()));
        let any = search
            .columns
            .iter()
            .map(|c| format!("{}::text LIKE ${}", quoted(c), n))
            .collect::<Vec<_>>()
            .join(" OR ");
        parts.push(format!("({})", any));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

pub fn count(desc: &ObjectDescriptor, selection: &Selection) -> QueryBuf {
    let mut q = QueryBuf::new();
    let filter = where_clause(&mut q, selection);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(&desc.table), filter);
    q
}

pub fn select(desc: &ObjectDescriptor, selection: &Selection) -> QueryBuf {
    let mut q = QueryBuf::new();
    let filter = where_clause(&mut q, selection);
    let mut sql = format!(
        "SELECT {} FROM {}{}",
        select_column_list(desc),
        qualified_table(&desc.table),
        filter
    );
    if !selection.sorts.is_empty() {
        let order = selection
            .sorts
            .iter()
            .map(|s| {
                format!(
                    "{} {}",
                    quoted(&s.column),
                    if s.descending { "DESC" } else { "ASC" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" ORDER BY {}", order));
    }
    sql.push_str(&format!(" LIMIT {} OFFSET {}", selection.limit, selection.offset));
    q.sql = sql;
    q
}

pub fn select_by_key(desc: &ObjectDescriptor, key: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = desc.primary_key();
    let ph = q.placeholder(pk.kind, key);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(desc),
        qualified_table(&desc.table),
        quoted(&pk.internal_name),
        ph
    );
    q
}

/// INSERT ... RETURNING. Columns absent from `row`, and an unset primary key,
/// are left to the table defaults.
pub fn insert(desc: &ObjectDescriptor, row: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&desc.table);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for field in desc.catalog.fields() {
        let Some(value) = row.get(&field.internal_name) else {
            continue;
        };
        if field.primary_key && is_unset_key(Some(value)) {
            continue;
        }
        cols.push(quoted(&field.internal_name));
        placeholders.push(q.placeholder(field.kind, value));
    }
    let returning = select_column_list(desc);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE assigning the catalog columns present in `changes`, never the key.
pub fn update(desc: &ObjectDescriptor, key: &Value, changes: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = desc.primary_key();
    let mut sets = Vec::new();
    for field in desc.catalog.fields().iter().filter(|f| !f.primary_key) {
        if let Some(value) = changes.get(&field.internal_name) {
            let ph = q.placeholder(field.kind, value);
            sets.push(format!("{} = {}", quoted(&field.internal_name), ph));
        }
    }
    let key_ph = q.placeholder(pk.kind, key);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        qualified_table(&desc.table),
        sets.join(", "),
        quoted(&pk.internal_name),
        key_ph
    );
    q
}

pub fn delete(desc: &ObjectDescriptor, key: &Value) -> QueryBuf {
    delete_many(desc, std::slice::from_ref(key))
}

pub fn delete_many(desc: &ObjectDescriptor, keys: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = desc.primary_key();
    let list = keys
        .iter()
        .map(|k| q.placeholder(pk.kind, k))
        .collect::<Vec<_>>()
        .join(", ");
    q.sql = format!(
        "DELETE FROM {} WHERE {} IN ({})",
        qualified_table(&desc.table),
        quoted(&pk.internal_name),
        list
    );
    q
}
