//! Admin site: runtime-shaped objects served under one prefix, addressed by name.

use crate::action::AdminAction;
use crate::config::{Handle, ObjectSummary};
use crate::engine::ObjectEngine;
use crate::error::AppError;
use crate::schema::DynRecord;
use std::collections::HashMap;
use std::sync::Arc;

pub type AdminEngine = ObjectEngine<DynRecord>;

pub struct AdminSite {
    prefix: String,
    objects: Vec<Arc<AdminEngine>>,
    by_name: HashMap<String, usize>,
    actions: HashMap<String, Vec<AdminAction>>,
}

impl AdminSite {
    pub(crate) fn new(prefix: String) -> Self {
        AdminSite {
            prefix,
            objects: Vec::new(),
            by_name: HashMap::new(),
            actions: HashMap::new(),
        }
    }

    /// Returns false when the name is taken. Actions with an empty, nested
    /// or repeated path are logged and dropped.
    pub(crate) fn insert(&mut self, engine: Arc<AdminEngine>, actions: Vec<AdminAction>) -> bool {
        let name = engine.descriptor().name.clone();
        if self.by_name.contains_key(&name) {
            return false;
        }
        let mut kept: Vec<AdminAction> = Vec::new();
        for action in actions {
            if action.path.is_empty()
                || action.path.contains('/')
                || kept.iter().any(|a| a.path == action.path)
            {
                tracing::warn!(object = %name, action = %action.name, path = %action.path, "admin action skipped");
                continue;
            }
            kept.push(action);
        }
        if !kept.is_empty() {
            self.actions.insert(name.clone(), kept);
        }
        self.by_name.insert(name, self.objects.len());
        self.objects.push(engine);
        true
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn objects(&self) -> &[Arc<AdminEngine>] {
        &self.objects
    }

    pub fn get(&self, name: &str) -> Option<&Arc<AdminEngine>> {
        self.by_name.get(name).map(|&i| &self.objects[i])
    }

    /// Look up an object and check it serves `handle`.
    pub fn object(&self, name: &str, handle: Handle) -> Result<&Arc<AdminEngine>, AppError> {
        let engine = self
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("object {}", name)))?;
        if !engine.descriptor().handles(handle) {
            return Err(AppError::BadRequest(format!("{} not allowed on {}", handle, name)));
        }
        Ok(engine)
    }

    pub fn actions(&self, object: &str) -> &[AdminAction] {
        self.actions.get(object).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn action(&self, object: &str, path: &str) -> Option<&AdminAction> {
        self.actions(object).iter().find(|a| a.path == path)
    }

    pub fn summaries(&self) -> Vec<ObjectSummary<'_>> {
        self.objects
            .iter()
            .map(|o| {
                let mut summary = o.descriptor().summary();
                summary.actions = self.actions(&o.descriptor().name);
                summary
            })
            .collect()
    }
}
