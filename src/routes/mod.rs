//! Router assembly: common routes, typed object routes, admin site routes.

mod admin;
mod common;
mod object;

pub use admin::admin_routes;
pub use common::common_routes;
pub use object::object_routes;
