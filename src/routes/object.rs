//! Routes of one typed object, mounted under its `{group}/{name}` path.
//! Only the handles the object allows are registered.

use crate::config::Handle;
use crate::engine::ObjectEngine;
use crate::handlers::object::{self as handlers, batch, create, delete_one, get_one, query, update};
use crate::hooks::HookContext;
use crate::schema::StructuredRecord;
use axum::{
    body::Bytes,
    extract::State,
    http::Method,
    routing::{delete, get, on, patch, post, put, MethodFilter, MethodRouter},
    Router,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Path segments taken by the fixed routes.
const RESERVED_SEGMENTS: [&str; 3] = ["", "query", "batch"];

type EngineRouter<R> = MethodRouter<Arc<ObjectEngine<R>>>;

fn merge<S: Clone + Send + Sync + 'static>(
    slot: Option<MethodRouter<S>>,
    next: MethodRouter<S>,
) -> Option<MethodRouter<S>> {
    Some(match slot {
        Some(current) => current.merge(next),
        None => next,
    })
}

fn view_filter(method: &Method) -> Option<MethodFilter> {
    match *method {
        Method::GET => Some(MethodFilter::GET),
        Method::POST => Some(MethodFilter::POST),
        _ => None,
    }
}

pub fn object_routes<R: StructuredRecord>(engine: Arc<ObjectEngine<R>>) -> Router {
    let desc = engine.descriptor().clone();
    let path = desc.path.clone();

    let mut root: Option<EngineRouter<R>> = None;
    let mut keyed: Option<EngineRouter<R>> = None;
    let mut router = Router::new();

    if desc.handles(Handle::Create) {
        root = merge(root, put(create::<R>));
    }
    if desc.handles(Handle::Query) {
        root = merge(root, post(query::<R>));
        router = router.route(&format!("{}/query", path), post(query::<R>));
    }
    if desc.handles(Handle::Batch) {
        router = router.route(&format!("{}/batch", path), post(batch::<R>));
    }
    if desc.handles(Handle::Get) {
        keyed = merge(keyed, get(get_one::<R>));
    }
    if desc.handles(Handle::Update) {
        keyed = merge(keyed, patch(update::<R>));
    }
    if desc.handles(Handle::Delete) {
        keyed = merge(keyed, delete(delete_one::<R>));
    }
    if let Some(root) = root {
        router = router.route(&path, root);
    }
    if let Some(keyed) = keyed {
        router = router.route(&format!("{}/:key", path), keyed);
    }

    // one route per view name, one method per view
    let mut views: BTreeMap<String, EngineRouter<R>> = BTreeMap::new();
    let mut seen: HashSet<(String, Method)> = HashSet::new();
    let served = if desc.handles(Handle::Query) { engine.views() } else { &[] };
    for view in served {
        let Some(filter) = view_filter(&view.method) else {
            tracing::warn!(object = %desc.name, view = %view.name, method = %view.method, "view method must be GET or POST, skipped");
            continue;
        };
        if RESERVED_SEGMENTS.contains(&view.name.as_str()) || view.name.contains('/') {
            tracing::warn!(object = %desc.name, view = %view.name, "view name is reserved or invalid, skipped");
            continue;
        }
        if !seen.insert((view.name.clone(), view.method.clone())) {
            tracing::warn!(object = %desc.name, view = %view.name, method = %view.method, "duplicate view, skipped");
            continue;
        }
        let name = view.name.clone();
        let method_router = on(
            filter,
            move |State(engine): State<Arc<ObjectEngine<R>>>, ctx: HookContext, body: Bytes| {
                let name = name.clone();
                async move { handlers::view(engine, ctx, &name, body).await }
            },
        );
        let entry = views.remove(&view.name);
        if let Some(merged) = merge(entry, method_router) {
            views.insert(view.name.clone(), merged);
        }
    }
    for (name, method_router) in views {
        router = router.route(&format!("{}/{}", path, name), method_router);
    }

    router.with_state(engine)
}
