//! Composition root: builds descriptors, caches field catalogs per shape,
//! rejects duplicate paths and assembles the application router.

use crate::admin::AdminSite;
use crate::config::{normalize_prefix, AdminConfig, ObjectDescriptor, Settings};
use crate::engine::ObjectEngine;
use crate::error::ConfigError;
use crate::object::{AdminObject, ObjectBuilder, WebObject};
use crate::routes::{admin_routes, common_routes, object_routes};
use crate::schema::{Catalog, Record, Shape, StructuredRecord};
use crate::state::AppState;
use crate::store::Store;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

pub struct Registry {
    store: Arc<dyn Store>,
    /// Keyed by shape name. Runtime shapes can share a name with different
    /// members, so each entry keeps the shape its catalog was extracted from.
    catalogs: HashMap<String, Vec<(Shape, Arc<Catalog>)>>,
    /// Mounted paths: typed object paths and admin prefixes.
    paths: Vec<String>,
    descriptors: Vec<Arc<ObjectDescriptor>>,
    router: Router,
}

/// Two mount points collide when one equals or nests inside the other.
fn overlaps(a: &str, b: &str) -> bool {
    let nested = |outer: &str, inner: &str| {
        inner
            .strip_prefix(outer)
            .is_some_and(|rest| rest.starts_with('/'))
    };
    a == b || nested(a, b) || nested(b, a)
}

impl Registry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Registry {
            store,
            catalogs: HashMap::new(),
            paths: Vec::new(),
            descriptors: Vec::new(),
            router: Router::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Every descriptor built so far, typed and admin.
    pub fn descriptors(&self) -> &[Arc<ObjectDescriptor>] {
        &self.descriptors
    }

    /// Field catalog of `shape`, extracted once per distinct shape.
    pub fn catalog(&mut self, shape: &Shape) -> Result<Arc<Catalog>, ConfigError> {
        let cached = self.catalogs.entry(shape.name.clone()).or_default();
        if let Some((_, catalog)) = cached.iter().find(|(seen, _)| seen == shape) {
            return Ok(catalog.clone());
        }
        let catalog = Arc::new(Catalog::extract(shape)?);
        cached.push((shape.clone(), catalog.clone()));
        Ok(catalog)
    }

    fn build<R: StructuredRecord>(
        &mut self,
        builder: ObjectBuilder<R>,
    ) -> Result<ObjectEngine<R>, ConfigError> {
        let catalog = self.catalog(&builder.shape)?;
        let descriptor = Arc::new(ObjectDescriptor::build(&builder.config, catalog)?);
        Ok(ObjectEngine::new(
            descriptor,
            self.store.clone(),
            builder.hooks,
            builder.views,
        ))
    }

    fn claim(&mut self, path: &str) -> Result<(), ConfigError> {
        if self.paths.iter().any(|taken| overlaps(taken, path)) {
            return Err(ConfigError::DuplicatePath(path.to_string()));
        }
        self.paths.push(path.to_string());
        Ok(())
    }

    /// Mount a typed object at `{group}/{name}`.
    pub fn register<T: Record>(
        &mut self,
        object: WebObject<T>,
    ) -> Result<Arc<ObjectDescriptor>, ConfigError> {
        let engine = self.build(object)?;
        let descriptor = engine.descriptor().clone();
        self.claim(&descriptor.path)?;
        let routes = object_routes(Arc::new(engine));
        self.router = std::mem::take(&mut self.router).merge(routes);
        self.descriptors.push(descriptor.clone());
        tracing::info!(object = %descriptor.name, path = %descriptor.path, table = %descriptor.table, "object registered");
        Ok(descriptor)
    }

    /// Like [`Registry::register`], but a failing object is logged and skipped.
    pub fn register_or_warn<T: Record>(&mut self, object: WebObject<T>) -> bool {
        match self.register(object) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "object skipped");
                false
            }
        }
    }

    /// Mount an admin site at `prefix`. Objects whose configuration fails are
    /// logged and skipped; a bad or taken prefix fails the whole site.
    pub fn admin(
        &mut self,
        prefix: &str,
        objects: Vec<AdminObject>,
    ) -> Result<Arc<AdminSite>, ConfigError> {
        let prefix = normalize_prefix(prefix)?;
        self.claim(&prefix)?;
        let mut site = AdminSite::new(prefix);
        for mut object in objects {
            let shape_name = object.shape.name.clone();
            let actions = std::mem::take(&mut object.actions);
            let engine = match self.build(object) {
                Ok(engine) => engine,
                Err(e) => {
                    tracing::warn!(shape = %shape_name, error = %e, "admin object skipped");
                    continue;
                }
            };
            let descriptor = engine.descriptor().clone();
            if !site.insert(Arc::new(engine), actions) {
                tracing::warn!(object = %descriptor.name, "admin object name taken, skipped");
                continue;
            }
            tracing::info!(object = %descriptor.name, prefix = %site.prefix(), "admin object registered");
            self.descriptors.push(descriptor);
        }
        let site = Arc::new(site);
        self.router = std::mem::take(&mut self.router).merge(admin_routes(site.clone()));
        Ok(site)
    }

    /// Mount the admin site described by a loaded configuration file.
    pub fn admin_from_config(&mut self, config: AdminConfig) -> Result<Arc<AdminSite>, ConfigError> {
        let objects = config
            .objects
            .into_iter()
            .map(AdminObject::from_config)
            .collect();
        self.admin(&config.prefix, objects)
    }

    /// Object and admin routes plus the common routes.
    pub fn into_router(self) -> Router {
        let state = AppState::new(self.store);
        self.router.merge(common_routes(state))
    }

    /// [`Registry::into_router`] with the configured request body limit.
    pub fn into_app(self, settings: &Settings) -> Router {
        self.into_router()
            .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
    }
}
