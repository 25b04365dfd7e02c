//! Raw per-object configuration, as written by users or loaded from JSON.

use crate::query::Order;
use crate::schema::Shape;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operations an object may expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handle {
    Get,
    Create,
    Update,
    Delete,
    Query,
    Batch,
}

impl Handle {
    pub const ALL: [Handle; 6] = [
        Handle::Get,
        Handle::Create,
        Handle::Update,
        Handle::Delete,
        Handle::Query,
        Handle::Batch,
    ];
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Handle::Get => "get",
            Handle::Create => "create",
            Handle::Update => "update",
            Handle::Delete => "delete",
            Handle::Query => "query",
            Handle::Batch => "batch",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    /// Resource name; defaults to the lower-cased shape name.
    #[serde(default)]
    pub name: Option<String>,
    /// Path prefix segments, e.g. `api` or `api/v1`.
    #[serde(default)]
    pub group: String,
    /// Storage table; defaults to the snake_case shape name.
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    /// Empty means every field is editable.
    #[serde(default)]
    pub editables: Vec<String>,
    /// Empty means nothing is filterable.
    #[serde(default)]
    pub filterables: Vec<String>,
    #[serde(default)]
    pub orderables: Vec<String>,
    #[serde(default)]
    pub searchables: Vec<String>,
    /// Applied when a query carries no accepted order.
    #[serde(default)]
    pub orders: Vec<Order>,
    /// Empty means all handlers.
    #[serde(default)]
    pub handlers: Vec<Handle>,
}

impl ObjectConfig {
    pub fn named(name: impl Into<String>) -> Self {
        ObjectConfig {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn editables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.editables = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn filterables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filterables = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn orderables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orderables = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn searchables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchables = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_orders(mut self, orders: Vec<Order>) -> Self {
        self.orders = orders;
        self
    }

    pub fn handlers(mut self, handlers: Vec<Handle>) -> Self {
        self.handlers = handlers;
        self
    }
}

/// An admin object: object configuration plus the runtime shape of its records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdminObjectConfig {
    #[serde(flatten)]
    pub object: ObjectConfig,
    pub shape: Shape,
}

/// Contents of an admin configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Mount point of the admin site, e.g. `/admin`.
    #[serde(default = "default_admin_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub objects: Vec<AdminObjectConfig>,
}

fn default_admin_prefix() -> String {
    "/admin".to_string()
}
