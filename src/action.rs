//! Custom admin actions: named operations on one record, a batch of keys or
//! the object as a whole, served at `{prefix}/{object}/_action/{path}`.

use crate::admin::AdminEngine;
use crate::config::ObjectDescriptor;
use crate::engine::Reply;
use crate::error::AppError;
use crate::hooks::HookContext;
use crate::mutation::{coerce_key, parse_key};
use crate::schema::record::wire_to_row;
use crate::schema::{DynRecord, StructuredRecord};
use crate::store::Store;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// What an action runs against.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionTarget {
    /// The record addressed by `?key=`, loaded before the handler runs.
    Record { key: Value, record: DynRecord },
    /// Primary keys from the `keys` member of the body.
    Keys(Vec<Value>),
    /// No record: the object as a whole.
    Object,
}

/// Input of an action handler. Owned, so handlers can be `async move` closures.
pub struct ActionRequest {
    pub ctx: HookContext,
    pub descriptor: Arc<ObjectDescriptor>,
    pub store: Arc<dyn Store>,
    pub target: ActionTarget,
    /// Request body; `Null` when empty.
    pub body: Value,
}

impl ActionRequest {
    /// Store `changes`, given by wire name, on the row with `key`. Unknown
    /// names and the primary key are dropped; the editable list does not apply.
    pub async fn update(&self, key: &Value, changes: &Map<String, Value>) -> Result<u64, AppError> {
        let mut row = wire_to_row(&self.descriptor.catalog, changes);
        row.remove(&self.descriptor.primary_key().internal_name);
        if row.is_empty() {
            return Err(AppError::NotChanged);
        }
        Ok(self.store.update(&self.descriptor, key, &row).await?)
    }
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn run(&self, request: ActionRequest) -> Result<Reply, AppError>;
}

#[async_trait]
impl<F, Fut> ActionHandler for F
where
    F: Fn(ActionRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Reply, AppError>> + Send + 'static,
{
    async fn run(&self, request: ActionRequest) -> Result<Reply, AppError> {
        self(request).await
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// A named admin operation. By default it targets one record.
#[derive(Clone, Serialize)]
pub struct AdminAction {
    pub path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "withoutObject")]
    pub without_object: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub batch: bool,
    #[serde(skip)]
    pub handler: Arc<dyn ActionHandler>,
}

impl AdminAction {
    /// The path defaults to the lowercased name with blanks as underscores.
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ActionRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, AppError>> + Send + 'static,
    {
        Self::with_handler(name, handler)
    }

    pub fn with_handler(name: impl Into<String>, handler: impl ActionHandler + 'static) -> Self {
        let name = name.into();
        let path = name
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("_");
        AdminAction {
            path,
            name,
            label: None,
            without_object: false,
            batch: false,
            handler: Arc::new(handler),
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn without_object(mut self) -> Self {
        self.without_object = true;
        self
    }

    pub fn batch(mut self) -> Self {
        self.batch = true;
        self
    }

    /// Resolve the target, then run the handler. A record action needs `key`
    /// and answers 404 when the record does not exist.
    pub async fn run(
        &self,
        engine: &AdminEngine,
        ctx: HookContext,
        key: Option<&str>,
        body: Value,
    ) -> Result<Reply, AppError> {
        let desc = engine.descriptor();
        let target = if self.without_object {
            ActionTarget::Object
        } else if self.batch {
            let Some(Value::Array(keys)) = body.get("keys") else {
                return Err(AppError::BadRequest("keys required".into()));
            };
            let keys = keys
                .iter()
                .map(|k| coerce_key(desc, k))
                .collect::<Result<Vec<_>, _>>()?;
            ActionTarget::Keys(keys)
        } else {
            let raw = key.ok_or_else(|| AppError::BadRequest("invalid primary key".into()))?;
            let key = parse_key(desc, raw)?;
            let row = engine
                .store()
                .find_one(desc, &key)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("{} {}", desc.name, key)))?;
            let record = DynRecord::from_row(&desc.catalog, row)?;
            ActionTarget::Record { key, record }
        };
        tracing::info!(object = %desc.name, action = %self.path, "admin action");
        self.handler
            .run(ActionRequest {
                ctx,
                descriptor: desc.clone(),
                store: engine.store().clone(),
                target,
                body,
            })
            .await
    }
}

impl std::fmt::Debug for AdminAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAction")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("without_object", &self.without_object)
            .field("batch", &self.batch)
            .finish()
    }
}
