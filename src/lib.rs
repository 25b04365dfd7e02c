//! object-rest: expose persisted record types as REST resources, driven by
//! per-object allow-lists for editing, filtering, ordering and search.
//!
//! Typed objects are Rust structs implementing [`Record`]; admin objects are
//! described entirely by configuration ([`AdminObjectConfig`]) and share the
//! same request pipeline through [`DynRecord`].

pub mod action;
pub mod admin;
mod case;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod migration;
pub mod mutation;
pub mod object;
pub mod query;
pub mod registry;
pub mod routes;
pub mod schema;
pub mod sql;
pub mod state;
pub mod store;

pub use action::{ActionHandler, ActionRequest, ActionTarget, AdminAction};
pub use admin::{AdminEngine, AdminSite};
pub use config::{
    load_admin_config, parse_admin_config, AdminConfig, AdminObjectConfig, Handle,
    ObjectConfig, ObjectDescriptor, Settings,
};
pub use engine::{ObjectEngine, Reply};
pub use error::{AppError, ConfigError};
pub use hooks::{HookContext, HookError, HookSet, QueryView, Rendered, ViewQuery};
pub use migration::ensure_tables;
pub use object::{AdminObject, ObjectBuilder, WebObject};
pub use query::{Filter, Order, QueryForm, QueryResult, DEFAULT_QUERY_LIMIT};
pub use registry::Registry;
pub use routes::{admin_routes, common_routes, object_routes};
pub use schema::{
    DynRecord, FieldDescriptor, FieldKind, Mapping, Member, MemberType, Record, Shape,
    StructuredRecord,
};
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Store, StoreError};
