//! store::factory
//!
//! Store selection and creation.
//!
//! # Design
//!
//! Callers use [`create_store`] instead of constructing a specific store
//! implementation, so the registry core only ever sees `dyn MetadataStore`.
//!
//! # Example
//!
//! ```
//! use model_registry::core::config::ClientConfig;
//! use model_registry::store::{create_store, StoreProvider};
//!
//! let mut config = ClientConfig::default();
//! config.client.store = Some("memory".to_string());
//!
//! let store = create_store(&config).unwrap();
//! assert_eq!(store.name(), StoreProvider::Memory.name());
//! ```

use std::sync::Arc;

use super::http::HttpStore;
use super::mock::MockStore;
use super::traits::{MetadataStore, StoreError};
use crate::core::config::ClientConfig;

/// Supported store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreProvider {
    /// Remote store over the JSON REST API
    Http,
    /// In-process store; contents live only as long as the client
    Memory,
}

impl StoreProvider {
    /// Get all available providers.
    pub fn all() -> &'static [StoreProvider] {
        &[StoreProvider::Http, StoreProvider::Memory]
    }

    /// Get the provider name as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            StoreProvider::Http => "http",
            StoreProvider::Memory => "memory",
        }
    }

    /// Parse a provider from a string (case-insensitive).
    ///
    /// # Example
    ///
    /// ```
    /// use model_registry::store::StoreProvider;
    ///
    /// assert_eq!(StoreProvider::parse("HTTP"), Some(StoreProvider::Http));
    /// assert_eq!(StoreProvider::parse("grpc"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(StoreProvider::Http),
            "memory" => Some(StoreProvider::Memory),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Create the store selected by the configuration.
///
/// # Errors
///
/// - `StoreError::InvalidArgument` if the configured provider is unknown
pub fn create_store(config: &ClientConfig) -> Result<Arc<dyn MetadataStore>, StoreError> {
    let provider = StoreProvider::parse(config.store()).ok_or_else(|| {
        StoreError::InvalidArgument(format!(
            "unknown store provider '{}', available: {}",
            config.store(),
            valid_store_names().join(", ")
        ))
    })?;

    let store: Arc<dyn MetadataStore> = match provider {
        StoreProvider::Http => Arc::new(HttpStore::with_user_agent(
            config.base_url(),
            config.user_agent(),
        )),
        StoreProvider::Memory => Arc::new(MockStore::new()),
    };
    Ok(store)
}

/// Get list of valid store names for configuration validation.
pub fn valid_store_names() -> &'static [&'static str] {
    &["http", "memory"]
}
