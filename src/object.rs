//! Object builders: configuration, shape, hooks and views of one resource.

use crate::action::AdminAction;
use crate::config::{AdminObjectConfig, ObjectConfig};
use crate::hooks::{
    AccessCheck, BeforeCreate, BeforeDelete, BeforeRender, BeforeUpdate, HookContext, HookError,
    HookSet, QueryView, Rendered,
};
use crate::schema::{DynRecord, Record, Shape};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct ObjectBuilder<R> {
    pub(crate) config: ObjectConfig,
    pub(crate) shape: Shape,
    pub(crate) hooks: HookSet<R>,
    pub(crate) views: Vec<QueryView>,
    /// Served only by an admin site.
    pub(crate) actions: Vec<AdminAction>,
}

/// A resource backed by a compile-time record type.
pub type WebObject<T> = ObjectBuilder<T>;

/// A resource whose shape comes from configuration.
pub type AdminObject = ObjectBuilder<DynRecord>;

impl<T: Record> ObjectBuilder<T> {
    pub fn new(config: ObjectConfig) -> Self {
        ObjectBuilder {
            config,
            shape: T::shape(),
            hooks: HookSet::default(),
            views: Vec::new(),
            actions: Vec::new(),
        }
    }
}

impl ObjectBuilder<DynRecord> {
    pub fn from_config(config: AdminObjectConfig) -> Self {
        ObjectBuilder {
            config: config.object,
            shape: config.shape,
            hooks: HookSet::default(),
            views: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn action(mut self, action: AdminAction) -> Self {
        self.actions.push(action);
        self
    }
}

impl<R: Send + Sync + 'static> ObjectBuilder<R> {
    pub fn config(&self) -> &ObjectConfig {
        &self.config
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn access<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.access = Some(Arc::new(f));
        self
    }

    pub fn before_create<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext, &mut R) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.before_create = Some(Arc::new(f));
        self
    }

    pub fn before_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext, &mut R, &Map<String, Value>) -> Result<(), HookError>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.before_update = Some(Arc::new(f));
        self
    }

    pub fn before_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext, &R) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.before_delete = Some(Arc::new(f));
        self
    }

    pub fn before_render<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext, &mut R) -> Result<Rendered, HookError> + Send + Sync + 'static,
    {
        self.hooks.before_render = Some(Arc::new(f));
        self
    }

    /// Install hooks implemented as types (e.g. async ones) rather than closures.
    pub fn hooks(mut self, hooks: HookSet<R>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn access_with(mut self, hook: impl AccessCheck + 'static) -> Self {
        self.hooks.access = Some(Arc::new(hook));
        self
    }

    pub fn before_create_with(mut self, hook: impl BeforeCreate<R> + 'static) -> Self {
        self.hooks.before_create = Some(Arc::new(hook));
        self
    }

    pub fn before_update_with(mut self, hook: impl BeforeUpdate<R> + 'static) -> Self {
        self.hooks.before_update = Some(Arc::new(hook));
        self
    }

    pub fn before_delete_with(mut self, hook: impl BeforeDelete<R> + 'static) -> Self {
        self.hooks.before_delete = Some(Arc::new(hook));
        self
    }

    pub fn before_render_with(mut self, hook: impl BeforeRender<R> + 'static) -> Self {
        self.hooks.before_render = Some(Arc::new(hook));
        self
    }

    pub fn view(mut self, view: QueryView) -> Self {
        self.views.push(view);
        self
    }
}
