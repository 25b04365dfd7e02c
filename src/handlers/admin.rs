//! HTTP handlers of the admin site. Objects are looked up by the first path segment.

use crate::admin::{AdminEngine, AdminSite};
use crate::config::Handle;
use crate::engine::{parse_body, parse_form, Reply};
use crate::error::AppError;
use crate::hooks::HookContext;
use crate::mutation::BatchForm;
use crate::query::QueryForm;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

async fn enter(
    site: &AdminSite,
    name: &str,
    handle: Handle,
    ctx: HookContext,
) -> Result<(Arc<AdminEngine>, HookContext), AppError> {
    let engine = site.object(name, handle)?.clone();
    let ctx = ctx.for_object(name);
    engine.check_access(&ctx).await?;
    Ok((engine, ctx))
}

/// `GET /_objects`: metadata of every admin object.
pub async fn list_objects(State(site): State<Arc<AdminSite>>) -> Response {
    Json(site.summaries()).into_response()
}

pub async fn query(
    State(site): State<Arc<AdminSite>>,
    ctx: HookContext,
    Path(object): Path<String>,
    body: Bytes,
) -> Result<Reply, AppError> {
    let (engine, ctx) = enter(&site, &object, Handle::Query, ctx).await?;
    let form: QueryForm = parse_form(&body)?;
    engine.query(&ctx, &form, &[]).await
}

pub async fn create(
    State(site): State<Arc<AdminSite>>,
    ctx: HookContext,
    Path(object): Path<String>,
    body: Bytes,
) -> Result<Reply, AppError> {
    let (engine, ctx) = enter(&site, &object, Handle::Create, ctx).await?;
    engine.create(&ctx, parse_body(&body)?).await
}

pub async fn batch(
    State(site): State<Arc<AdminSite>>,
    ctx: HookContext,
    Path(object): Path<String>,
    body: Bytes,
) -> Result<Reply, AppError> {
    let (engine, ctx) = enter(&site, &object, Handle::Batch, ctx).await?;
    let form: BatchForm = parse_form(&body)?;
    engine.batch(&ctx, form).await
}

/// `GET /{object}/{key}`: a GET view of that name, else the record with that key.
pub async fn get_one(
    State(site): State<Arc<AdminSite>>,
    ctx: HookContext,
    Path((object, key)): Path<(String, String)>,
) -> Result<Reply, AppError> {
    let view = site
        .get(&object)
        .and_then(|engine| engine.view(&key, &ctx.method).cloned());
    if let Some(view) = view {
        let (engine, ctx) = enter(&site, &object, Handle::Query, ctx).await?;
        return engine.run_view(&ctx, &view, QueryForm::default()).await;
    }
    let (engine, ctx) = enter(&site, &object, Handle::Get, ctx).await?;
    engine.get_one(&ctx, &key).await
}

/// `POST /{object}/{view}`.
pub async fn view(
    State(site): State<Arc<AdminSite>>,
    ctx: HookContext,
    Path((object, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<Reply, AppError> {
    let (engine, ctx) = enter(&site, &object, Handle::Query, ctx).await?;
    let view = engine
        .view(&name, &ctx.method)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("view {}", name)))?;
    let form: QueryForm = parse_form(&body)?;
    engine.run_view(&ctx, &view, form).await
}

pub async fn update(
    State(site): State<Arc<AdminSite>>,
    ctx: HookContext,
    Path((object, key)): Path<(String, String)>,
    body: Bytes,
) -> Result<Reply, AppError> {
    let (engine, ctx) = enter(&site, &object, Handle::Update, ctx).await?;
    engine.update(&ctx, &key, parse_body(&body)?).await
}

pub async fn delete_one(
    State(site): State<Arc<AdminSite>>,
    ctx: HookContext,
    Path((object, key)): Path<(String, String)>,
) -> Result<Reply, AppError> {
    let (engine, ctx) = enter(&site, &object, Handle::Delete, ctx).await?;
    engine.delete(&ctx, &key).await
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionParams {
    pub key: Option<String>,
}

/// `POST /{object}/_action/{action}`. Gated by the access hook only.
pub async fn action(
    State(site): State<Arc<AdminSite>>,
    ctx: HookContext,
    Path((object, path)): Path<(String, String)>,
    Query(params): Query<ActionParams>,
    body: Bytes,
) -> Result<Reply, AppError> {
    let engine = site
        .get(&object)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("object {}", object)))?;
    let action = site
        .action(&object, &path)
        .cloned()
        .ok_or_else(|| AppError::BadRequest(format!("unknown action {}", path)))?;
    let ctx = ctx.for_object(&object);
    engine.check_access(&ctx).await?;
    action
        .run(&engine, ctx, params.key.as_deref(), parse_body(&body)?)
        .await
}
