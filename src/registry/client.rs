//! registry::client
//!
//! The public registry surface.
//!
//! # Design
//!
//! [`ModelRegistry`] owns one store handle and one client-scoped
//! [`TypeCache`]. Its generic operations (`register`, `get`, `get_by_id`,
//! `list`) work for any [`Entity`]; the per-kind methods are thin wrappers
//! that only fix the type parameter and the parent.
//!
//! The registry is cheap to clone and safe to share: clones share the store
//! and the type cache.
//!
//! # Example
//!
//! ```
//! use model_registry::registry::{ModelArtifact, ModelRegistry, ModelVersion, RegisteredModel};
//! use model_registry::store::mock::MockStore;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let registry = ModelRegistry::new(Arc::new(MockStore::new()));
//!
//! let model = registry.register_model(&RegisteredModel::new("iris")).await.unwrap();
//! let version = registry
//!     .register_version(&ModelVersion::new("iris", "v1"))
//!     .await
//!     .unwrap();
//! let artifact = registry
//!     .register_artifact(
//!         &ModelArtifact::new(version.id.unwrap(), "model.onnx")
//!             .with_uri("s3://models/iris/v1/model.onnx"),
//!     )
//!     .await
//!     .unwrap();
//!
//! assert_eq!(model.id.map(|id| id.get()), Some(1));
//! assert_eq!(artifact.model_version, version.id.unwrap());
//! # });
//! ```

use std::sync::Arc;

use super::cursor::{ListOptions, PaginationCursor};
use super::entities::{ModelArtifact, ModelVersion, RegisteredModel};
use super::error::RegistryError;
use super::mapping::{from_primitive, Entity};
use super::type_cache::TypeCache;
use super::upsert::UpsertEngine;
use crate::core::config::{ClientConfig, DEFAULT_PAGE_SIZE};
use crate::core::types::{NodeId, ParentRef};
use crate::store::{create_store, CallOptions, MetadataStore, StoreError};

/// Client for registering and querying models, versions and artifacts.
#[derive(Clone)]
pub struct ModelRegistry {
    store: Arc<dyn MetadataStore>,
    types: Arc<TypeCache>,
    opts: CallOptions,
    page_size: usize,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("store", &self.store.name())
            .field("types", &self.types)
            .field("opts", &self.opts)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl ModelRegistry {
    /// Create a registry over `store` with default call options.
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            types: Arc::new(TypeCache::new()),
            opts: CallOptions::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a registry from configuration.
    ///
    /// Selects the store backend and applies the configured per-call
    /// deadline and listing page size.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if the config is invalid or names an unknown store.
    pub fn connect(config: &ClientConfig) -> Result<Self, RegistryError> {
        config.validate()?;
        let store = create_store(config)?;
        Ok(Self {
            store,
            types: Arc::new(TypeCache::new()),
            opts: config.call_options(),
            page_size: config.page_size(),
        })
    }

    /// A registry sharing this one's store and type cache but applying
    /// different per-call options.
    pub fn with_call_options(&self, opts: CallOptions) -> Self {
        Self {
            opts,
            ..self.clone()
        }
    }

    /// Get the store this registry talks to.
    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    /// Get the type cache shared by this registry and its clones.
    pub fn type_cache(&self) -> &Arc<TypeCache> {
        &self.types
    }

    pub fn call_options(&self) -> CallOptions {
        self.opts
    }

    fn engine(&self) -> UpsertEngine<'_> {
        UpsertEngine::new(self.store.as_ref(), &self.types, self.opts)
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    /// Register an entity: create it if absent, otherwise reconcile it.
    ///
    /// Returns the entity as stored, with its id and timestamps.
    pub async fn register<E: Entity>(&self, entity: &E) -> Result<E, RegistryError> {
        let engine = self.engine();
        let scope = match entity.parent() {
            Some(parent) => Some(engine.resolve_parent(E::table(), &parent).await?),
            None => None,
        };
        let (_, stored) = engine.upsert(entity, scope).await?;
        Ok(stored)
    }

    /// Get an entity by name under an optional parent.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no such entity exists
    /// - `ParentNotFound` if a named parent does not exist
    pub async fn get<E: Entity>(
        &self,
        name: &str,
        parent: Option<&ParentRef>,
    ) -> Result<E, RegistryError> {
        let table = E::table();
        let engine = self.engine();
        let type_id = engine.type_id(table).await?;
        let scope = match parent {
            Some(parent) => Some(engine.resolve_parent(table, parent).await?),
            None => None,
        };

        match self
            .store
            .get_node_by_name(type_id, name, scope, &self.opts)
            .await
        {
            Ok(node) => Ok(from_primitive(&node, type_id)?),
            Err(StoreError::NotFound(_)) => Err(RegistryError::NotFound {
                type_name: table.type_name.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Get an entity by its store id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no node has this id, or the node is of another kind
    pub async fn get_by_id<E: Entity>(&self, id: NodeId) -> Result<E, RegistryError> {
        let table = E::table();
        let type_id = self.engine().type_id(table).await?;
        let not_found = || RegistryError::NotFound {
            type_name: table.type_name.to_string(),
            name: format!("#{}", id),
        };

        match self.store.get_node(id, &self.opts).await {
            Ok(node) if node.type_id == type_id => Ok(from_primitive(&node, type_id)?),
            Ok(_) | Err(StoreError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// List entities of one kind, optionally restricted to a parent.
    ///
    /// Nothing is fetched until the cursor is advanced.
    pub fn list<E: Entity>(
        &self,
        parent: Option<ParentRef>,
        options: ListOptions,
    ) -> PaginationCursor<E> {
        let options = ListOptions {
            page_size: options.page_size.or(Some(self.page_size)),
            ..options
        };
        PaginationCursor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.types),
            self.opts,
            parent,
            options,
        )
    }

    // =========================================================================
    // Registered models
    // =========================================================================

    pub async fn register_model(
        &self,
        model: &RegisteredModel,
    ) -> Result<RegisteredModel, RegistryError> {
        self.register(model).await
    }

    pub async fn get_model(&self, name: &str) -> Result<RegisteredModel, RegistryError> {
        self.get(name, None).await
    }

    pub async fn get_model_by_id(&self, id: NodeId) -> Result<RegisteredModel, RegistryError> {
        self.get_by_id(id).await
    }

    pub fn list_models(&self, options: ListOptions) -> PaginationCursor<RegisteredModel> {
        self.list(None, options)
    }

    // =========================================================================
    // Model versions
    // =========================================================================

    pub async fn register_version(
        &self,
        version: &ModelVersion,
    ) -> Result<ModelVersion, RegistryError> {
        self.register(version).await
    }

    /// Get a version of `model` (by id or name).
    pub async fn get_version(
        &self,
        model: impl Into<ParentRef>,
        name: &str,
    ) -> Result<ModelVersion, RegistryError> {
        self.get(name, Some(&model.into())).await
    }

    pub async fn get_version_by_id(&self, id: NodeId) -> Result<ModelVersion, RegistryError> {
        self.get_by_id(id).await
    }

    /// List versions of `model` (by id or name).
    pub fn list_versions(
        &self,
        model: impl Into<ParentRef>,
        options: ListOptions,
    ) -> PaginationCursor<ModelVersion> {
        self.list(Some(model.into()), options)
    }

    // =========================================================================
    // Model artifacts
    // =========================================================================

    pub async fn register_artifact(
        &self,
        artifact: &ModelArtifact,
    ) -> Result<ModelArtifact, RegistryError> {
        self.register(artifact).await
    }

    pub async fn get_artifact(
        &self,
        version: NodeId,
        name: &str,
    ) -> Result<ModelArtifact, RegistryError> {
        self.get(name, Some(&ParentRef::Id(version))).await
    }

    pub async fn get_artifact_by_id(&self, id: NodeId) -> Result<ModelArtifact, RegistryError> {
        self.get_by_id(id).await
    }

    pub fn list_artifacts(
        &self,
        version: NodeId,
        options: ListOptions,
    ) -> PaginationCursor<ModelArtifact> {
        self.list(Some(ParentRef::Id(version)), options)
    }
}
