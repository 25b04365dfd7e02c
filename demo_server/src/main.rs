//! Demo server: a typed `article` object plus an admin site described in `admin.json`.
//!
//! Run from the repo root: `cargo run -p demo-server`
//! Uses PostgreSQL when `DATABASE_URL` is set, in-memory storage otherwise.

use axum::http::Method;
use chrono::{DateTime, Utc};
use object_rest::{
    ensure_tables, load_admin_config, parse_admin_config, Filter, HookError, Member, MemberType,
    MemoryStore, ObjectConfig, Order, PgStore, QueryView, Record, Registry, Settings, Shape, Store,
    ViewQuery, WebObject,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

const BUNDLED_ADMIN_CONFIG: &str = include_str!("../admin.json");

#[derive(Debug, Serialize, Deserialize)]
struct Article {
    #[serde(default)]
    id: i64,
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    published: bool,
    #[serde(default)]
    author: Option<String>,
    #[serde(rename = "createdAt", default)]
    created_at: Option<DateTime<Utc>>,
}

impl Record for Article {
    fn shape() -> Shape {
        Shape::new("Article")
            .member(Member::new("id", MemberType::Integer).primary_key())
            .member(Member::new("title", MemberType::String))
            .member(Member::new("body", MemberType::String))
            .member(Member::new("published", MemberType::Boolean))
            .member(Member::new("author", MemberType::optional(MemberType::String)))
            .member(
                Member::new("created_at", MemberType::optional(MemberType::DateTime))
                    .rename("createdAt"),
            )
    }
}

fn articles() -> WebObject<Article> {
    let config = ObjectConfig::named("articles")
        .group("api")
        .editables(["title", "body", "published"])
        .filterables(["published", "author", "createdAt"])
        .orderables(["createdAt", "title"])
        .searchables(["title", "body"])
        .default_orders(vec![Order::desc("createdAt")]);

    WebObject::new(config)
        .before_create(|_ctx, article: &mut Article| {
            if article.title.trim().is_empty() {
                return Err(HookError::new("title is required"));
            }
            article.created_at = Some(Utc::now());
            Ok(())
        })
        .before_delete(|_ctx, article: &Article| {
            if article.published {
                return Err(HookError::new("unpublish before deleting"));
            }
            Ok(())
        })
        .view(QueryView::new("published", Method::GET).prepare(|_ctx, form| {
            Ok(ViewQuery {
                form,
                scope: vec![Filter::new("published", "=", json!(true))],
            })
        }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("object_rest=info,demo_server=info")),
        )
        .init();

    let mut pool = None;
    let store: Arc<dyn Store> = match &settings.database_url {
        Some(url) => {
            let pg = PgStore::connect(url).await?;
            pool = Some(pg.pool().clone());
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            Arc::new(MemoryStore::new())
        }
    };

    let admin_config = match &settings.admin_config_path {
        Some(path) => load_admin_config(path)?,
        None => parse_admin_config(BUNDLED_ADMIN_CONFIG)?,
    };

    let mut registry = Registry::new(store);
    registry.register_or_warn(articles());
    registry.admin_from_config(admin_config)?;

    if let Some(pool) = pool {
        ensure_tables(&pool, registry.descriptors().iter().map(|d| d.as_ref())).await?;
    }

    let app = registry.into_app(&settings);
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("demo server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
