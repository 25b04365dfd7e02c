//! HTTP handlers of a typed object. State is the object's engine.

use crate::engine::{parse_body, parse_form, ObjectEngine, Reply};
use crate::error::AppError;
use crate::hooks::HookContext;
use crate::mutation::BatchForm;
use crate::query::QueryForm;
use crate::schema::StructuredRecord;
use axum::{
    body::Bytes,
    extract::{Path, State},
};
use std::sync::Arc;

async fn enter<R: StructuredRecord>(
    engine: &ObjectEngine<R>,
    ctx: HookContext,
) -> Result<HookContext, AppError> {
    let ctx = ctx.for_object(&engine.descriptor().name);
    engine.check_access(&ctx).await?;
    Ok(ctx)
}

pub async fn get_one<R: StructuredRecord>(
    State(engine): State<Arc<ObjectEngine<R>>>,
    ctx: HookContext,
    Path(key): Path<String>,
) -> Result<Reply, AppError> {
    let ctx = enter(&engine, ctx).await?;
    engine.get_one(&ctx, &key).await
}

pub async fn create<R: StructuredRecord>(
    State(engine): State<Arc<ObjectEngine<R>>>,
    ctx: HookContext,
    body: Bytes,
) -> Result<Reply, AppError> {
    let ctx = enter(&engine, ctx).await?;
    engine.create(&ctx, parse_body(&body)?).await
}

pub async fn update<R: StructuredRecord>(
    State(engine): State<Arc<ObjectEngine<R>>>,
    ctx: HookContext,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Reply, AppError> {
    let ctx = enter(&engine, ctx).await?;
    engine.update(&ctx, &key, parse_body(&body)?).await
}

pub async fn delete_one<R: StructuredRecord>(
    State(engine): State<Arc<ObjectEngine<R>>>,
    ctx: HookContext,
    Path(key): Path<String>,
) -> Result<Reply, AppError> {
    let ctx = enter(&engine, ctx).await?;
    engine.delete(&ctx, &key).await
}

pub async fn query<R: StructuredRecord>(
    State(engine): State<Arc<ObjectEngine<R>>>,
    ctx: HookContext,
    body: Bytes,
) -> Result<Reply, AppError> {
    let ctx = enter(&engine, ctx).await?;
    let form: QueryForm = parse_form(&body)?;
    engine.query(&ctx, &form, &[]).await
}

pub async fn batch<R: StructuredRecord>(
    State(engine): State<Arc<ObjectEngine<R>>>,
    ctx: HookContext,
    body: Bytes,
) -> Result<Reply, AppError> {
    let ctx = enter(&engine, ctx).await?;
    let form: BatchForm = parse_form(&body)?;
    engine.batch(&ctx, form).await
}

/// Shared body of every view route; `name` is fixed when the route is built.
pub async fn view<R: StructuredRecord>(
    engine: Arc<ObjectEngine<R>>,
    ctx: HookContext,
    name: &str,
    body: Bytes,
) -> Result<Reply, AppError> {
    let ctx = enter(&engine, ctx).await?;
    let view = engine
        .view(name, &ctx.method)
        .ok_or_else(|| AppError::NotFound(format!("view {}", name)))?
        .clone();
    let form: QueryForm = parse_form(&body)?;
    engine.run_view(&ctx, &view, form).await
}
