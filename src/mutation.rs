//! Update payload filtering, primary-key parsing and batch forms.

use crate::config::ObjectDescriptor;
use crate::error::AppError;
use crate::schema::value::{accepts, coerce, normalize};
use crate::schema::Row;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Turn an update payload into a column update set.
///
/// Keys resolve like allow-list entries, so `name` reaches a `Name` member.
/// The primary key and unknown names are dropped, values are kind-checked
/// (a mismatch names the field), and the rest is intersected with the
/// editable allow-list. An empty result is "not changed".
pub fn prepare_update(desc: &ObjectDescriptor, input: &Map<String, Value>) -> Result<Row, AppError> {
    let mut changes = Row::new();
    for (name, value) in input {
        let Some(field) = desc.catalog.resolve(name) else {
            tracing::debug!(object = %desc.name, key = %name, "unknown update key dropped");
            continue;
        };
        if field.primary_key {
            continue;
        }
        if !accepts(field, value) {
            return Err(AppError::Validation(format!(
                "{}: expected {}",
                field.external_name, field.kind
            )));
        }
        if !desc.editable.allows(&field.internal_name) {
            tracing::debug!(object = %desc.name, key = %name, "field not editable, dropped");
            continue;
        }
        changes.insert(field.internal_name.clone(), normalize(field, value.clone()));
    }
    if changes.is_empty() {
        return Err(AppError::NotChanged);
    }
    Ok(changes)
}

/// Coerce a path segment to the primary key's kind.
pub fn parse_key(desc: &ObjectDescriptor, raw: &str) -> Result<Value, AppError> {
    coerce_key(desc, &Value::String(raw.to_string()))
}

pub fn coerce_key(desc: &ObjectDescriptor, raw: &Value) -> Result<Value, AppError> {
    coerce(desc.primary_key().kind, raw)
        .ok_or_else(|| AppError::BadRequest("invalid primary key".into()))
}

/// Body of `POST {object}/batch`. Only `delete` is served.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchForm {
    #[serde(default)]
    pub delete: Vec<Value>,
    #[serde(default)]
    pub create: Vec<Value>,
    #[serde(default)]
    pub update: Vec<Value>,
}

impl BatchForm {
    /// Validated delete keys.
    pub fn delete_keys(&self, desc: &ObjectDescriptor) -> Result<Vec<Value>, AppError> {
        if !self.create.is_empty() {
            return Err(AppError::BadRequest("batch create is not supported".into()));
        }
        if !self.update.is_empty() {
            return Err(AppError::BadRequest("batch update is not supported".into()));
        }
        if self.delete.is_empty() {
            return Err(AppError::BadRequest("empty batch".into()));
        }
        self.delete.iter().map(|k| coerce_key(desc, k)).collect()
    }
}
