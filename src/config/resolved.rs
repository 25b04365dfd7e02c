//! Resolved object descriptor: configuration validated against a field catalog.

use crate::action::AdminAction;
use crate::config::types::{Handle, ObjectConfig};
use crate::error::ConfigError;
use crate::query::Sort;
use crate::schema::{Catalog, FieldDescriptor};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Editable allow-list. An empty configured list means every field.
#[derive(Clone, Debug, PartialEq)]
pub enum Editable {
    All,
    Only(BTreeSet<String>),
}

impl Editable {
    pub fn allows(&self, internal_name: &str) -> bool {
        match self {
            Editable::All => true,
            Editable::Only(set) => set.contains(internal_name),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ObjectDescriptor {
    /// Resource name (last URL segment).
    pub name: String,
    /// Normalized group prefix, `""` or `/a/b`.
    pub group: String,
    /// `{group}/{name}`.
    pub path: String,
    pub table: String,
    pub desc: Option<String>,
    pub catalog: Arc<Catalog>,
    pub editable: Editable,
    /// Internal names.
    pub filterable: BTreeSet<String>,
    pub orderable: BTreeSet<String>,
    /// Internal names in configured order.
    pub searchable: Vec<String>,
    pub default_orders: Vec<Sort>,
    pub handlers: BTreeSet<Handle>,
}

impl ObjectDescriptor {
    /// Validate `config` against `catalog`; see [`crate::config::resolve_object`].
    pub fn build(config: &ObjectConfig, catalog: Arc<Catalog>) -> Result<Self, ConfigError> {
        crate::config::loader::resolve_object(config, catalog)
    }

    pub fn primary_key(&self) -> &FieldDescriptor {
        self.catalog.primary_key()
    }

    pub fn field_by_external(&self, name: &str) -> Option<&FieldDescriptor> {
        self.catalog.by_external(name)
    }

    pub fn field_by_internal(&self, name: &str) -> Option<&FieldDescriptor> {
        self.catalog.by_internal(name)
    }

    pub fn handles(&self, handle: Handle) -> bool {
        self.handlers.contains(&handle)
    }

    /// Public metadata for the admin console.
    pub fn summary(&self) -> ObjectSummary<'_> {
        let external = |internal: &String| {
            self.catalog
                .by_internal(internal)
                .map(|f| f.external_name.as_str())
        };
        ObjectSummary {
            name: &self.name,
            group: &self.group,
            path: &self.path,
            desc: self.desc.as_deref(),
            primary_key: &self.primary_key().external_name,
            fields: self.catalog.fields(),
            editables: match &self.editable {
                Editable::All => self
                    .catalog
                    .fields()
                    .iter()
                    .map(|f| f.external_name.as_str())
                    .collect(),
                Editable::Only(set) => set.iter().filter_map(external).collect(),
            },
            filterables: self.filterable.iter().filter_map(external).collect(),
            orderables: self.orderable.iter().filter_map(external).collect(),
            searchables: self.searchable.iter().filter_map(external).collect(),
            actions: &[],
        }
    }
}

#[derive(Serialize)]
pub struct ObjectSummary<'a> {
    pub name: &'a str,
    pub group: &'a str,
    pub path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<&'a str>,
    #[serde(rename = "primaryKey")]
    pub primary_key: &'a str,
    pub fields: &'a [FieldDescriptor],
    pub editables: Vec<&'a str>,
    pub filterables: Vec<&'a str>,
    pub orderables: Vec<&'a str>,
    pub searchables: Vec<&'a str>,
    #[serde(skip_serializing_if = "no_actions")]
    pub actions: &'a [AdminAction],
}

fn no_actions(actions: &&[AdminAction]) -> bool {
    actions.is_empty()
}
