//! Resolve object configuration against a catalog; load admin configuration files.

use crate::case::to_snake_case;
use crate::config::resolved::{Editable, ObjectDescriptor};
use crate::config::types::{AdminConfig, Handle, ObjectConfig};
use crate::config::validator::{normalize_group, validate_name};
use crate::error::ConfigError;
use crate::query::Sort;
use crate::schema::Catalog;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Build a descriptor. Allow-list entries that match no catalog field are dropped.
pub fn resolve_object(
    config: &ObjectConfig,
    catalog: Arc<Catalog>,
) -> Result<ObjectDescriptor, ConfigError> {
    let name = config
        .name
        .clone()
        .unwrap_or_else(|| catalog.shape_name().to_lowercase());
    validate_name(&name)?;
    let group = normalize_group(&config.group)?;
    let path = format!("{}/{}", group, name);

    let table = match &config.table {
        Some(table) if !table.trim().is_empty() => table.trim().to_string(),
        _ => to_snake_case(catalog.shape_name()),
    };

    let editable = if config.editables.is_empty() {
        Editable::All
    } else {
        Editable::Only(resolve_set(&catalog, &name, "editables", &config.editables))
    };
    let filterable = resolve_set(&catalog, &name, "filterables", &config.filterables);
    let orderable = resolve_set(&catalog, &name, "orderables", &config.orderables);

    let mut searchable = Vec::new();
    for internal in resolve_list(&catalog, &name, "searchables", &config.searchables) {
        if !searchable.contains(&internal) {
            searchable.push(internal);
        }
    }

    let mut default_orders = Vec::new();
    for order in &config.orders {
        match catalog.resolve(&order.name) {
            Some(field) => default_orders.push(Sort {
                column: field.internal_name.clone(),
                descending: order.op.eq_ignore_ascii_case("desc"),
            }),
            None => tracing::warn!(object = %name, entry = %order.name, "default order names no field, dropped"),
        }
    }

    let handlers: BTreeSet<Handle> = if config.handlers.is_empty() {
        Handle::ALL.into_iter().collect()
    } else {
        config.handlers.iter().copied().collect()
    };

    Ok(ObjectDescriptor {
        name,
        group,
        path,
        table,
        desc: config.desc.clone(),
        catalog,
        editable,
        filterable,
        orderable,
        searchable,
        default_orders,
        handlers,
    })
}

fn resolve_list(catalog: &Catalog, object: &str, list: &str, entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| match catalog.resolve(entry) {
            Some(field) => Some(field.internal_name.clone()),
            None => {
                tracing::debug!(object = %object, list = %list, entry = %entry, "allow-list entry names no field, dropped");
                None
            }
        })
        .collect()
}

fn resolve_set(catalog: &Catalog, object: &str, list: &str, entries: &[String]) -> BTreeSet<String> {
    resolve_list(catalog, object, list, entries).into_iter().collect()
}

/// Read an admin configuration file (JSON).
pub fn load_admin_config(path: impl AsRef<Path>) -> Result<AdminConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_admin_config(&text)
}

pub fn parse_admin_config(text: &str) -> Result<AdminConfig, ConfigError> {
    serde_json::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))
}
