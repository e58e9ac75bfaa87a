//! registry::upsert
//!
//! Idempotent "create if absent, else reconcile" for any entity kind.
//!
//! # Algorithm
//!
//! 1. Resolve the entity's type id through the [`TypeCache`].
//! 2. For scoped kinds, check that the scope names an existing node of the
//!    parent type.
//! 3. At most two attempts:
//!    - look the node up by (type, name, scope);
//!    - if found, reconcile: send only the properties that differ, and skip
//!      the update entirely when nothing does;
//!    - if absent, create it. `AlreadyExists` on the first attempt means a
//!      concurrent creator won; loop once more and reconcile against its node.
//!      `AlreadyExists` on the second attempt is a consistency error.
//! 4. After a write, re-read the node so the returned entity carries
//!    store-assigned timestamps and any properties other writers set.
//!
//! # Reconcile Rules
//!
//! Caller values win. Stored keys the caller omitted are preserved. A caller
//! custom key that names a declared property already on the node, and that
//! the mapping table does not map itself, is compared against and written
//! back to the declared property map. Custom keys that share a name with a
//! mapped field stay in the custom map; the mapped field owns the declared
//! slot.

use tracing::{debug, info, warn};

use super::error::RegistryError;
use super::mapping::{from_primitive, to_primitive, Entity, MappingError, MappingTable};
use super::type_cache::TypeCache;
use crate::core::types::{NodeId, ParentRef, TypeId};
use crate::store::{CallOptions, MetadataStore, PropertyDelta, StoreError, TypedNode};

/// Creation attempts before a conflict is reported as an inconsistency.
const MAX_ATTEMPTS: usize = 2;

/// Upsert engine borrowing a store and a type cache for one operation.
pub struct UpsertEngine<'a> {
    store: &'a dyn MetadataStore,
    types: &'a TypeCache,
    opts: CallOptions,
}

impl<'a> UpsertEngine<'a> {
    pub fn new(store: &'a dyn MetadataStore, types: &'a TypeCache, opts: CallOptions) -> Self {
        Self { store, types, opts }
    }

    /// Resolve the type id of `table`.
    pub async fn type_id(&self, table: &MappingTable) -> Result<TypeId, RegistryError> {
        self.types.resolve(self.store, table, &self.opts).await
    }

    /// Resolve a parent reference of an entity of kind `table` to a node id.
    ///
    /// Ids pass through unchecked; [`upsert`](Self::upsert) verifies them.
    /// Names are looked up store-wide on the parent type.
    ///
    /// # Errors
    ///
    /// - `ParentNotFound` if no parent of that name exists, or if the parent
    ///   kind is itself scoped and so cannot be found by name alone
    pub async fn resolve_parent(
        &self,
        table: &MappingTable,
        parent: &ParentRef,
    ) -> Result<NodeId, RegistryError> {
        let name = match parent {
            ParentRef::Id(id) => return Ok(*id),
            ParentRef::Name(name) => name,
        };
        let not_found = || RegistryError::ParentNotFound {
            type_name: table.type_name.to_string(),
            parent: parent.to_string(),
        };

        let parent_table = match table.parent {
            Some(parent_table) if !parent_table.is_scoped() => parent_table,
            _ => return Err(not_found()),
        };
        let parent_type = self.type_id(parent_table).await?;

        match self
            .store
            .get_node_by_name(parent_type, name, None, &self.opts)
            .await
        {
            Ok(node) => node.id.ok_or_else(not_found),
            Err(StoreError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Create or reconcile `entity`, returning its id and stored state.
    ///
    /// `scope` is the resolved parent id for scoped kinds and is ignored
    /// otherwise.
    ///
    /// # Errors
    ///
    /// - `ParentNotFound` if the scope is missing, absent, or of another type
    /// - `Consistency` if creation conflicts twice
    /// - `Rejected` if the store refuses the payload
    pub async fn upsert<E: Entity>(
        &self,
        entity: &E,
        scope: Option<NodeId>,
    ) -> Result<(NodeId, E), RegistryError> {
        let table = E::table();
        let type_id = self.type_id(table).await?;
        let scope = match table.parent {
            Some(parent_table) => Some(self.check_parent(table, parent_table, scope).await?),
            None => None,
        };

        let mut desired = to_primitive(entity, type_id);
        desired.id = None;
        desired.scope = scope;
        desired.create_time_since_epoch = None;
        desired.last_update_time_since_epoch = None;

        let mut attempt = 1;
        loop {
            match self
                .store
                .get_node_by_name(type_id, &desired.name, scope, &self.opts)
                .await
            {
                Ok(existing) => return self.reconcile(table, type_id, existing, &desired).await,
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }

            match self.store.create_node(desired.clone(), &self.opts).await {
                Ok(id) => {
                    info!(
                        type_name = %table.type_name,
                        name = %desired.name,
                        node_id = %id,
                        "created node"
                    );
                    return self.reread(id, type_id).await;
                }
                Err(StoreError::AlreadyExists(_)) if attempt < MAX_ATTEMPTS => {
                    warn!(
                        type_name = %table.type_name,
                        name = %desired.name,
                        attempt,
                        "node created concurrently, retrying lookup"
                    );
                    attempt += 1;
                }
                Err(StoreError::AlreadyExists(_)) => {
                    return Err(RegistryError::Consistency {
                        type_name: table.type_name.to_string(),
                        name: desired.name,
                    })
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Check that `scope` names an existing node of the parent type.
    async fn check_parent(
        &self,
        table: &MappingTable,
        parent_table: &MappingTable,
        scope: Option<NodeId>,
    ) -> Result<NodeId, RegistryError> {
        let not_found = |parent: String| RegistryError::ParentNotFound {
            type_name: table.type_name.to_string(),
            parent,
        };
        let scope = scope.ok_or_else(|| not_found("(none)".to_string()))?;
        let parent_type = self.type_id(parent_table).await?;

        match self.store.get_node(scope, &self.opts).await {
            Ok(node) if node.type_id == parent_type => Ok(scope),
            Ok(_) | Err(StoreError::NotFound(_)) => Err(not_found(ParentRef::Id(scope).to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn reconcile<E: Entity>(
        &self,
        table: &MappingTable,
        type_id: TypeId,
        existing: TypedNode,
        desired: &TypedNode,
    ) -> Result<(NodeId, E), RegistryError> {
        let id = existing.id.ok_or_else(|| MappingError::MissingId {
            type_name: E::table().type_name,
            name: existing.name.clone(),
        })?;

        let delta = property_delta(table, &existing, desired);
        if delta.is_empty() {
            debug!(type_name = %table.type_name, node_id = %id, "node up to date");
            return Ok((id, from_primitive(&existing, type_id)?));
        }

        let changed = delta.properties.len() + delta.custom_properties.len();
        self.store.update_node(id, delta, &self.opts).await?;
        info!(type_name = %table.type_name, node_id = %id, changed, "updated node");
        self.reread(id, type_id).await
    }

    async fn reread<E: Entity>(
        &self,
        id: NodeId,
        type_id: TypeId,
    ) -> Result<(NodeId, E), RegistryError> {
        let node = self.store.get_node(id, &self.opts).await?;
        Ok((id, from_primitive(&node, type_id)?))
    }
}

/// Properties of `desired` that differ from `existing`.
///
/// `table` decides where a custom key that collides with a declared property
/// belongs: folded-in declared keys are reconciled in the declared map,
/// mapped keys never are.
pub fn property_delta(
    table: &MappingTable,
    existing: &TypedNode,
    desired: &TypedNode,
) -> PropertyDelta {
    let mut delta = PropertyDelta::default();

    for (key, value) in &desired.properties {
        if existing.properties.get(key) != Some(value) {
            delta.properties.insert(key.clone(), value.clone());
        }
    }

    for (key, value) in &desired.custom_properties {
        let folded = match table.kind_of(key) {
            None => existing.properties.get(key),
            Some(_) => None,
        };
        if let Some(stored) = folded {
            if stored != value {
                delta.properties.insert(key.clone(), value.clone());
            }
        } else if existing.custom_properties.get(key) != Some(value) {
            delta.custom_properties.insert(key.clone(), value.clone());
        }
    }

    delta
}
