//! The object engine: one request pipeline shared by typed and admin objects.

use crate::config::ObjectDescriptor;
use crate::error::AppError;
use crate::hooks::{HookContext, HookSet, QueryView, Rendered, ViewQuery};
use crate::mutation::{parse_key, prepare_update, BatchForm};
use crate::query::{compile_query, compile_scope, Filter, QueryForm, QueryResult};
use crate::schema::StructuredRecord;
use crate::store::Store;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

/// Successful outcome of an engine operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Record(Value),
    Page(QueryResult<Value>),
    /// `true`.
    Done,
    Redirect(String),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Record(value) => Json(value).into_response(),
            Reply::Page(page) => Json(page).into_response(),
            Reply::Done => Json(true).into_response(),
            Reply::Redirect(url) => (StatusCode::FOUND, [(header::LOCATION, url)]).into_response(),
        }
    }
}

pub struct ObjectEngine<R> {
    descriptor: Arc<ObjectDescriptor>,
    store: Arc<dyn Store>,
    hooks: HookSet<R>,
    views: Vec<QueryView>,
}

impl<R: StructuredRecord> ObjectEngine<R> {
    pub fn new(
        descriptor: Arc<ObjectDescriptor>,
        store: Arc<dyn Store>,
        hooks: HookSet<R>,
        views: Vec<QueryView>,
    ) -> Self {
        ObjectEngine {
            descriptor,
            store,
            hooks,
            views,
        }
    }

    pub fn descriptor(&self) -> &Arc<ObjectDescriptor> {
        &self.descriptor
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn views(&self) -> &[QueryView] {
        &self.views
    }

    pub fn view(&self, name: &str, method: &Method) -> Option<&QueryView> {
        self.views
            .iter()
            .find(|v| v.name == name && &v.method == method)
    }

    fn not_found(&self, key: &Value) -> AppError {
        AppError::NotFound(format!("{} {}", self.descriptor.name, key))
    }

    /// Run the access hook, if any. A veto is a 403.
    pub async fn check_access(&self, ctx: &HookContext) -> Result<(), AppError> {
        if let Some(access) = &self.hooks.access {
            access
                .check(ctx)
                .await
                .map_err(|e| AppError::Forbidden(e.0))?;
        }
        Ok(())
    }

    async fn render(&self, ctx: &HookContext, mut record: R) -> Result<Reply, AppError> {
        if let Some(hook) = &self.hooks.before_render {
            match hook.before_render(ctx, &mut record).await? {
                Rendered::Keep => {}
                Rendered::Replace(value) => return Ok(Reply::Record(value)),
                Rendered::Redirect(url) => return Ok(Reply::Redirect(url)),
            }
        }
        Ok(Reply::Record(record.to_wire()?))
    }

    pub async fn get_one(&self, ctx: &HookContext, raw_key: &str) -> Result<Reply, AppError> {
        let key = parse_key(&self.descriptor, raw_key)?;
        let row = self
            .store
            .find_one(&self.descriptor, &key)
            .await?
            .ok_or_else(|| self.not_found(&key))?;
        let record = R::from_row(&self.descriptor.catalog, row)?;
        self.render(ctx, record).await
    }

    /// Create from a full record body. Not gated by the editable list.
    pub async fn create(&self, ctx: &HookContext, body: Value) -> Result<Reply, AppError> {
        let catalog = &self.descriptor.catalog;
        let mut record = R::decode(catalog, body)?;
        if let Some(hook) = &self.hooks.before_create {
            hook.before_create(ctx, &mut record).await?;
        }
        let row = record.to_row(catalog)?;
        let stored = self.store.insert(&self.descriptor, &row).await?;
        tracing::info!(object = %self.descriptor.name, "record created");
        let record = R::from_row(catalog, stored)?;
        self.render(ctx, record).await
    }

    pub async fn update(&self, ctx: &HookContext, raw_key: &str, body: Value) -> Result<Reply, AppError> {
        let key = parse_key(&self.descriptor, raw_key)?;
        let Value::Object(input) = body else {
            return Err(AppError::BadRequest("body must be a JSON object".into()));
        };
        let changes = prepare_update(&self.descriptor, &input)?;
        if let Some(hook) = &self.hooks.before_update {
            let mut existing = self.load(&key).await?;
            hook.before_update(ctx, &mut existing, &input).await?;
        }
        let affected = self.store.update(&self.descriptor, &key, &changes).await?;
        if affected == 0 {
            return Err(self.not_found(&key));
        }
        Ok(Reply::Done)
    }

    pub async fn delete(&self, ctx: &HookContext, raw_key: &str) -> Result<Reply, AppError> {
        let key = parse_key(&self.descriptor, raw_key)?;
        let existing = self.load(&key).await?;
        if let Some(hook) = &self.hooks.before_delete {
            hook.before_delete(ctx, &existing).await?;
        }
        if self.store.delete(&self.descriptor, &key).await? == 0 {
            return Err(self.not_found(&key));
        }
        tracing::info!(object = %self.descriptor.name, key = %key, "record deleted");
        Ok(Reply::Done)
    }

    /// One `delete_many` call; `before_delete` is not run per key.
    pub async fn batch(&self, _ctx: &HookContext, form: BatchForm) -> Result<Reply, AppError> {
        let keys = form.delete_keys(&self.descriptor)?;
        let deleted = self.store.delete_many(&self.descriptor, &keys).await?;
        tracing::info!(object = %self.descriptor.name, requested = keys.len(), deleted, "batch delete");
        Ok(Reply::Done)
    }

    /// Count first; fetch the page only when something matches.
    pub async fn query(&self, ctx: &HookContext, form: &QueryForm, scope: &[Filter]) -> Result<Reply, AppError> {
        let mut selection = compile_query(&self.descriptor, form);
        selection.conditions.extend(compile_scope(&self.descriptor, scope));

        let total = self.store.count(&self.descriptor, &selection).await?;
        let mut page = QueryResult {
            total,
            offset: selection.offset,
            limit: selection.limit,
            keyword: form.keyword.clone(),
            items: Vec::new(),
        };
        if total == 0 {
            return Ok(Reply::Page(page));
        }

        let rows = self.store.fetch(&self.descriptor, &selection).await?;
        page.items.reserve(rows.len());
        for row in rows {
            let record = R::from_row(&self.descriptor.catalog, row)?;
            match self.render(ctx, record).await? {
                Reply::Record(item) => page.items.push(item),
                other => return Ok(other),
            }
        }
        Ok(Reply::Page(page))
    }

    /// Run a named view: its prepare hook may rewrite the form and add scope filters.
    pub async fn run_view(&self, ctx: &HookContext, view: &QueryView, form: QueryForm) -> Result<Reply, AppError> {
        let prepared = match &view.prepare {
            Some(prepare) => prepare.prepare(ctx, form).await?,
            None => ViewQuery {
                form,
                scope: Vec::new(),
            },
        };
        self.query(ctx, &prepared.form, &prepared.scope).await
    }

    async fn load(&self, key: &Value) -> Result<R, AppError> {
        let row = self
            .store
            .find_one(&self.descriptor, key)
            .await?
            .ok_or_else(|| self.not_found(key))?;
        R::from_row(&self.descriptor.catalog, row)
    }
}

/// Parse a JSON request body; an empty body is `Null`.
pub fn parse_body(bytes: &[u8]) -> Result<Value, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
}

/// Query forms accept an empty body as the default form.
pub fn parse_form<T: serde::de::DeserializeOwned + Default>(bytes: &[u8]) -> Result<T, AppError> {
    match parse_body(bytes)? {
        Value::Null => Ok(T::default()),
        value => serde_json::from_value(value).map_err(|e| AppError::BadRequest(e.to_string())),
    }
}
