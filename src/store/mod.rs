//! Persistence seam. The engine talks to storage only through [`Store`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::ObjectDescriptor;
use crate::query::Selection;
pub use crate::schema::Row;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Parameterized persistence over one object's table. Implementations never
/// interpolate values into statements.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// Rows matching the selection's predicates, ignoring its page window.
    async fn count(&self, desc: &ObjectDescriptor, selection: &Selection) -> Result<u64, StoreError>;

    /// One ordered page of matching rows.
    async fn fetch(&self, desc: &ObjectDescriptor, selection: &Selection)
        -> Result<Vec<Row>, StoreError>;

    async fn find_one(&self, desc: &ObjectDescriptor, key: &Value) -> Result<Option<Row>, StoreError>;

    /// Insert and return the stored row, including a generated key.
    async fn insert(&self, desc: &ObjectDescriptor, row: &Row) -> Result<Row, StoreError>;

    /// Assign `changes` to the row with `key`; returns rows affected.
    async fn update(&self, desc: &ObjectDescriptor, key: &Value, changes: &Row)
        -> Result<u64, StoreError>;

    async fn delete(&self, desc: &ObjectDescriptor, key: &Value) -> Result<u64, StoreError>;

    /// Delete all rows whose key is in `keys` as one operation.
    async fn delete_many(&self, desc: &ObjectDescriptor, keys: &[Value]) -> Result<u64, StoreError>;
}

/// A key the storage should generate: absent, null, `0` or `""`.
pub fn is_unset_key(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Number(n)) => n.as_i64() == Some(0),
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unset_keys() {
        assert!(is_unset_key(None));
        assert!(is_unset_key(Some(&json!(null))));
        assert!(is_unset_key(Some(&json!(0))));
        assert!(is_unset_key(Some(&json!(""))));
        assert!(!is_unset_key(Some(&json!(7))));
        assert!(!is_unset_key(Some(&json!("k"))));
    }
}
