//! Extension points around the request pipeline.
//!
//! Each hook is a single-method async trait. Plain closures implement the
//! record hooks through blanket impls, so most callers never name the traits.

use crate::query::{Filter, QueryForm};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, Method},
};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// A veto raised by a hook. Its message is returned to the client.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        HookError(message.into())
    }
}

/// Request information handed to every hook.
#[derive(Clone, Debug)]
pub struct HookContext {
    /// Resource name of the object serving the request.
    pub object: String,
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

impl HookContext {
    pub fn for_object(mut self, object: &str) -> Self {
        self.object = object.to_string();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for HookContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(HookContext {
            object: String::new(),
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            headers: parts.headers.clone(),
        })
    }
}

/// Outcome of `before_render`.
#[derive(Clone, Debug, PartialEq)]
pub enum Rendered {
    /// Serialize the (possibly mutated) record.
    Keep,
    /// Send this JSON instead of the record.
    Replace(Value),
    /// Answer the whole request with a redirect.
    Redirect(String),
}

#[async_trait]
pub trait BeforeCreate<R>: Send + Sync {
    async fn before_create(&self, ctx: &HookContext, record: &mut R) -> Result<(), HookError>;
}

#[async_trait]
pub trait BeforeUpdate<R>: Send + Sync {
    /// `existing` is the stored record; `input` the raw update payload.
    async fn before_update(
        &self,
        ctx: &HookContext,
        existing: &mut R,
        input: &Map<String, Value>,
    ) -> Result<(), HookError>;
}

#[async_trait]
pub trait BeforeDelete<R>: Send + Sync {
    async fn before_delete(&self, ctx: &HookContext, record: &R) -> Result<(), HookError>;
}

#[async_trait]
pub trait BeforeRender<R>: Send + Sync {
    async fn before_render(&self, ctx: &HookContext, record: &mut R) -> Result<Rendered, HookError>;
}

/// Per-object authorization predicate, run before anything else.
#[async_trait]
pub trait AccessCheck: Send + Sync {
    async fn check(&self, ctx: &HookContext) -> Result<(), HookError>;
}

/// What a view runs: the (rewritten) client form plus trusted scope filters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewQuery {
    pub form: QueryForm,
    pub scope: Vec<Filter>,
}

#[async_trait]
pub trait PrepareQuery: Send + Sync {
    async fn prepare(&self, ctx: &HookContext, form: QueryForm) -> Result<ViewQuery, HookError>;
}

#[async_trait]
impl<R, F> BeforeCreate<R> for F
where
    R: Send + 'static,
    F: Fn(&HookContext, &mut R) -> Result<(), HookError> + Send + Sync,
{
    async fn before_create(&self, ctx: &HookContext, record: &mut R) -> Result<(), HookError> {
        self(ctx, record)
    }
}

#[async_trait]
impl<R, F> BeforeUpdate<R> for F
where
    R: Send + 'static,
    F: Fn(&HookContext, &mut R, &Map<String, Value>) -> Result<(), HookError> + Send + Sync,
{
    async fn before_update(
        &self,
        ctx: &HookContext,
        existing: &mut R,
        input: &Map<String, Value>,
    ) -> Result<(), HookError> {
        self(ctx, existing, input)
    }
}

#[async_trait]
impl<R, F> BeforeDelete<R> for F
where
    R: Sync + 'static,
    F: Fn(&HookContext, &R) -> Result<(), HookError> + Send + Sync,
{
    async fn before_delete(&self, ctx: &HookContext, record: &R) -> Result<(), HookError> {
        self(ctx, record)
    }
}

#[async_trait]
impl<R, F> BeforeRender<R> for F
where
    R: Send + 'static,
    F: Fn(&HookContext, &mut R) -> Result<Rendered, HookError> + Send + Sync,
{
    async fn before_render(&self, ctx: &HookContext, record: &mut R) -> Result<Rendered, HookError> {
        self(ctx, record)
    }
}

#[async_trait]
impl<F> AccessCheck for F
where
    F: Fn(&HookContext) -> Result<(), HookError> + Send + Sync,
{
    async fn check(&self, ctx: &HookContext) -> Result<(), HookError> {
        self(ctx)
    }
}

#[async_trait]
impl<F> PrepareQuery for F
where
    F: Fn(&HookContext, QueryForm) -> Result<ViewQuery, HookError> + Send + Sync,
{
    async fn prepare(&self, ctx: &HookContext, form: QueryForm) -> Result<ViewQuery, HookError> {
        self(ctx, form)
    }
}

/// The hook slots of one object.
pub struct HookSet<R> {
    pub access: Option<Arc<dyn AccessCheck>>,
    pub before_create: Option<Arc<dyn BeforeCreate<R>>>,
    pub before_update: Option<Arc<dyn BeforeUpdate<R>>>,
    pub before_delete: Option<Arc<dyn BeforeDelete<R>>>,
    pub before_render: Option<Arc<dyn BeforeRender<R>>>,
}

impl<R> Default for HookSet<R> {
    fn default() -> Self {
        HookSet {
            access: None,
            before_create: None,
            before_update: None,
            before_delete: None,
            before_render: None,
        }
    }
}

impl<R> Clone for HookSet<R> {
    fn clone(&self) -> Self {
        HookSet {
            access: self.access.clone(),
            before_create: self.before_create.clone(),
            before_update: self.before_update.clone(),
            before_delete: self.before_delete.clone(),
            before_render: self.before_render.clone(),
        }
    }
}

/// A named query endpoint served at `{object path}/{name}`.
#[derive(Clone)]
pub struct QueryView {
    pub name: String,
    pub method: Method,
    pub prepare: Option<Arc<dyn PrepareQuery>>,
}

impl QueryView {
    pub fn new(name: impl Into<String>, method: Method) -> Self {
        QueryView {
            name: name.into(),
            method,
            prepare: None,
        }
    }

    pub fn prepare<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext, QueryForm) -> Result<ViewQuery, HookError> + Send + Sync + 'static,
    {
        self.prepare = Some(Arc::new(f));
        self
    }

    pub fn prepare_with(mut self, hook: impl PrepareQuery + 'static) -> Self {
        self.prepare = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for QueryView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryView")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("prepare", &self.prepare.is_some())
            .finish()
    }
}
