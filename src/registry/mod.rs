//! registry
//!
//! Entity mapping and idempotent upsert over a metadata store.
//!
//! # Architecture
//!
//! Leaves first:
//!
//! - [`type_cache`]: resolves and memoizes store type ids per type name
//! - [`mapping`]: pure conversion between entities and store nodes
//! - [`upsert`]: create-if-absent, else reconcile, with one conflict retry
//! - [`cursor`]: lazy, restartable listing over paginated results
//! - [`client`]: [`ModelRegistry`], the public surface
//!
//! Registration flows caller -> registry -> mapping -> upsert engine (type
//! cache, store) -> mapping -> caller. Listing flows caller -> registry ->
//! cursor -> store -> mapping, one item at a time.

pub mod client;
pub mod cursor;
pub mod entities;
pub mod error;
pub mod mapping;
pub mod type_cache;
pub mod upsert;

pub use client::ModelRegistry;
pub use cursor::{ListOptions, PaginationCursor};
pub use entities::{
    ArtifactKind, ArtifactState, ModelArtifact, ModelVersion, ModelVersionState, ParseEnumError,
    RegisteredModel, RegisteredModelState,
};
pub use error::RegistryError;
pub use mapping::{Entity, MappingError, MappingTable};
pub use type_cache::TypeCache;
pub use upsert::UpsertEngine;
