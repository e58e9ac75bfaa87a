//! model-registry - register and query ML models against a metadata store
//!
//! The crate lets callers work with registered models, model versions and
//! model artifacts without speaking the store's generic vocabulary of typed
//! nodes, property maps, type schemas and page tokens.
//!
//! # Architecture
//!
//! - [`core`] - Identifiers, tagged property values, configuration
//! - [`store`] - The `MetadataStore` transport trait with HTTP and in-memory
//!   implementations
//! - [`registry`] - Type cache, entity mapping, idempotent upsert, pagination
//!   and the [`ModelRegistry`] facade
//!
//! # Guarantees
//!
//! 1. Registering the same entity twice yields the same id, and issues no
//!    update when nothing changed
//! 2. Concurrent registrations of one new name create exactly one node
//! 3. Listings are lazy and page-token driven
//! 4. Properties a newer schema adds are carried as custom properties, never
//!    dropped
//!
//! # Logging
//!
//! Events are emitted through `tracing`. The crate never installs a
//! subscriber.

pub mod core;
pub mod registry;
pub mod store;

pub use crate::core::config::ClientConfig;
pub use crate::core::types::{NodeId, ParentRef, TypeId};
pub use crate::core::value::{PropertyKind, PropertyValue};
pub use registry::{ListOptions, ModelRegistry, RegistryError};
