//! store
//!
//! Abstraction for the remote metadata store.
//!
//! # Architecture
//!
//! The `MetadataStore` trait defines the generic verbs the registry core
//! issues: type lookup and creation, node lookup, creation and update, and
//! token-paginated listing. The registry obtains a store through
//! [`create_store`] rather than importing a specific implementation.
//!
//! # Modules
//!
//! - `traits`: Core `MetadataStore` trait and the store's generic primitives
//! - [`http`]: JSON REST implementation using reqwest
//! - [`mock`]: In-memory implementation for deterministic testing
//! - `factory`: Store selection and creation

mod factory;
pub mod http;
pub mod mock;
mod traits;

pub use factory::{create_store, valid_store_names, StoreProvider};
pub use traits::*;
