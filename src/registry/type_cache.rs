//! registry::type_cache
//!
//! Client-scoped cache of store-assigned type ids.
//!
//! # Resolution
//!
//! On a miss the cache looks the type up by name. A found schema must be
//! compatible with the mapping table: same category, and every mapped key
//! declared with the same kind. Extra declared keys are fine. A missing type
//! is created from the table; if another client creates it first, the
//! `AlreadyExists` is absorbed and the type is read back.
//!
//! # Invariants
//!
//! - Entries are never invalidated for the lifetime of the cache.
//! - The lock is never held across a store call.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::error::RegistryError;
use super::mapping::MappingTable;
use crate::core::types::TypeId;
use crate::store::{CallOptions, MetadataStore, StoreError, TypeSchema};

/// Memoized type-name to type-id resolution.
#[derive(Debug, Default)]
pub struct TypeCache {
    entries: RwLock<HashMap<String, TypeId>>,
}

impl TypeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached id without touching the store.
    pub fn get(&self, type_name: &str) -> Option<TypeId> {
        self.entries.read().get(type_name).copied()
    }

    /// Number of resolved types.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Resolve the type id for `table`, registering the type if needed.
    ///
    /// # Errors
    ///
    /// - `SchemaConflict` if the stored type is incompatible with the table
    /// - `Transient` if the store timed out or was unreachable
    pub async fn resolve(
        &self,
        store: &dyn MetadataStore,
        table: &MappingTable,
        opts: &CallOptions,
    ) -> Result<TypeId, RegistryError> {
        if let Some(id) = self.get(table.type_name) {
            debug!(type_name = %table.type_name, type_id = %id, "type cache hit");
            return Ok(id);
        }
        debug!(type_name = %table.type_name, "type cache miss");

        let id = match store.get_type_by_name(table.type_name, opts).await {
            Ok(schema) => compatible_id(table, &schema)?,
            Err(StoreError::NotFound(_)) => {
                match store.create_type(table.schema(), opts).await {
                    Ok(id) => {
                        info!(type_name = %table.type_name, type_id = %id, "registered type");
                        id
                    }
                    Err(StoreError::AlreadyExists(_)) => {
                        warn!(
                            type_name = %table.type_name,
                            "type created concurrently, reading it back"
                        );
                        let schema = store.get_type_by_name(table.type_name, opts).await?;
                        compatible_id(table, &schema)?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = self.entries.write();
        Ok(*entries.entry(table.type_name.to_string()).or_insert(id))
    }
}

/// Check a stored schema against the table and return its id.
fn compatible_id(table: &MappingTable, schema: &TypeSchema) -> Result<TypeId, RegistryError> {
    let conflict = |reason: String| RegistryError::SchemaConflict {
        type_name: table.type_name.to_string(),
        reason: format!("{} (mapping v{})", reason, table.version),
    };

    if schema.category != table.category {
        return Err(conflict(format!(
            "category is {}, expected {}",
            schema.category, table.category
        )));
    }

    for (key, kind) in table.fields {
        match schema.properties.get(*key) {
            None => return Err(conflict(format!("property '{}' is not declared", key))),
            Some(found) if found != kind => {
                return Err(conflict(format!(
                    "property '{}' has kind {}, expected {}",
                    key, found, kind
                )))
            }
            Some(_) => {}
        }
    }

    schema
        .id
        .ok_or_else(|| conflict("stored type has no id".to_string()))
}
