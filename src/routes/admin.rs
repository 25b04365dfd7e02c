//! Admin site routes. Objects are resolved per request from the first segment
//! after the prefix, so one set of routes serves every admin object.

use crate::admin::AdminSite;
use crate::handlers::admin::{
    action, batch, create, delete_one, get_one, list_objects, query, update, view,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn admin_routes(site: Arc<AdminSite>) -> Router {
    let prefix = site.prefix().to_string();
    Router::new()
        .route(&format!("{}/_objects", prefix), get(list_objects))
        .route(&format!("{}/:object", prefix), post(query).put(create))
        .route(&format!("{}/:object/query", prefix), post(query))
        .route(&format!("{}/:object/batch", prefix), post(batch))
        .route(&format!("{}/:object/_action/:action", prefix), post(action))
        .route(
            &format!("{}/:object/:key", prefix),
            get(get_one).patch(update).delete(delete_one).post(view),
        )
        .with_state(site)
}
