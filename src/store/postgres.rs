//! PostgreSQL storage through sqlx.

use crate::config::ObjectDescriptor;
use crate::query::Selection;
use crate::sql::{self, bind_all, QueryBuf};
use crate::store::{Row, Store, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Ok(PgStore::new(PgPool::connect(url).await?))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_rows(&self, q: &QueryBuf) -> Result<Vec<Row>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Row>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_json))
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let result = bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn count(&self, desc: &ObjectDescriptor, selection: &Selection) -> Result<u64, StoreError> {
        use sqlx::Row as _;
        let q = sql::count(desc, selection);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get(0)?;
        Ok(total.max(0) as u64)
    }

    async fn fetch(&self, desc: &ObjectDescriptor, selection: &Selection) -> Result<Vec<Row>, StoreError> {
        self.fetch_rows(&sql::select(desc, selection)).await
    }

    async fn find_one(&self, desc: &ObjectDescriptor, key: &Value) -> Result<Option<Row>, StoreError> {
        self.fetch_optional(&sql::select_by_key(desc, key)).await
    }

    async fn insert(&self, desc: &ObjectDescriptor, row: &Row) -> Result<Row, StoreError> {
        let q = sql::insert(desc, row);
        self.fetch_optional(&q)
            .await?
            .ok_or_else(|| StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn update(&self, desc: &ObjectDescriptor, key: &Value, changes: &Row) -> Result<u64, StoreError> {
        let has_assignments = desc
            .catalog
            .fields()
            .iter()
            .any(|f| !f.primary_key && changes.contains_key(&f.internal_name));
        if !has_assignments {
            return Ok(0);
        }
        self.execute(&sql::update(desc, key, changes)).await
    }

    async fn delete(&self, desc: &ObjectDescriptor, key: &Value) -> Result<u64, StoreError> {
        self.execute(&sql::delete(desc, key)).await
    }

    async fn delete_many(&self, desc: &ObjectDescriptor, keys: &[Value]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.execute(&sql::delete_many(desc, keys)).await
    }
}

fn row_to_json(row: &PgRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    let mut map = Row::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row as _;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(crate::schema::value::format_datetime(&d));
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
