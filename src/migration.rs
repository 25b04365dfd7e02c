//! Create the tables backing registered objects (PostgreSQL).
//!
//! DDL is derived from each descriptor's catalog. Idempotent: schemas and
//! tables use IF NOT EXISTS and existing tables are left untouched.

use crate::config::ObjectDescriptor;
use crate::schema::{FieldDescriptor, FieldKind};
use crate::sql::{qualified_table, quoted};
use crate::store::StoreError;
use sqlx::PgPool;
use std::collections::BTreeSet;

fn column_type(field: &FieldDescriptor) -> &'static str {
    match field.kind {
        FieldKind::Integer if field.primary_key => "BIGINT GENERATED BY DEFAULT AS IDENTITY",
        FieldKind::String => "TEXT",
        FieldKind::Integer => "BIGINT",
        FieldKind::Float => "DOUBLE PRECISION",
        FieldKind::Boolean => "BOOLEAN",
        FieldKind::DateTime => "TIMESTAMPTZ",
        FieldKind::Object | FieldKind::Array | FieldKind::Map => "JSONB",
    }
}

/// `CREATE TABLE IF NOT EXISTS` for one descriptor.
pub fn create_table_sql(desc: &ObjectDescriptor) -> String {
    let cols: Vec<String> = desc
        .catalog
        .fields()
        .iter()
        .map(|f| {
            let mut def = format!("{} {}", quoted(&f.internal_name), column_type(f));
            if f.primary_key {
                def.push_str(" PRIMARY KEY");
            }
            def
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified_table(&desc.table),
        cols.join(", ")
    )
}

/// Create missing schemas and tables for `descriptors`. A table shared by
/// several descriptors is created once, from the first.
pub async fn ensure_tables<'a, I>(pool: &PgPool, descriptors: I) -> Result<(), StoreError>
where
    I: IntoIterator<Item = &'a ObjectDescriptor>,
{
    let mut seen = BTreeSet::new();
    for desc in descriptors {
        if !seen.insert(desc.table.clone()) {
            continue;
        }
        if let Some((schema, _)) = desc.table.split_once('.') {
            let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema));
            tracing::debug!(sql = %sql, "migrate");
            sqlx::query(&sql).execute(pool).await?;
        }
        let sql = create_table_sql(desc);
        tracing::debug!(sql = %sql, "migrate");
        sqlx::query(&sql).execute(pool).await?;
        tracing::info!(table = %desc.table, object = %desc.name, "table ready");
    }
    Ok(())
}
