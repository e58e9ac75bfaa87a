//! registry::error
//!
//! Error taxonomy for registry operations.
//!
//! Store failures are classified on the way in: `DeadlineExceeded` and
//! `Unavailable` become [`RegistryError::Transient`], `InvalidArgument`
//! becomes [`RegistryError::Rejected`], and everything else is carried as
//! [`RegistryError::Store`]. `NotFound` and a first `AlreadyExists` are
//! handled inside the type cache and upsert engine and only reach callers
//! when they carry meaning for them.

use thiserror::Error;

use super::mapping::MappingError;
use crate::core::config::ConfigError;
use crate::store::StoreError;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No entity with this name exists under the given parent.
    #[error("{type_name} '{name}' not found")]
    NotFound { type_name: String, name: String },

    /// The store already holds a type of this name with an incompatible shape.
    #[error("type '{type_name}' conflicts with the registered schema: {reason}")]
    SchemaConflict { type_name: String, reason: String },

    /// The parent named by the entity does not exist or has the wrong type.
    #[error("parent {parent} of {type_name} not found")]
    ParentNotFound { type_name: String, parent: String },

    /// The store timed out or was unreachable. Retrying may succeed.
    #[error("transient store failure: {0}")]
    Transient(StoreError),

    /// Creation conflicted, and the conflicting node could not be read back.
    #[error("{type_name} '{name}' conflicted on creation twice; the store is inconsistent")]
    Consistency { type_name: String, name: String },

    /// The store rejected the request payload.
    #[error("store rejected request: {0}")]
    Rejected(String),

    /// A stored node could not be mapped to a domain entity.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Any other store failure.
    #[error(transparent)]
    Store(StoreError),

    /// The client configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RegistryError {
    /// Check whether retrying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::Transient(_))
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            e if e.is_transient() => RegistryError::Transient(e),
            StoreError::InvalidArgument(message) => RegistryError::Rejected(message),
            e => RegistryError::Store(e),
        }
    }
}
