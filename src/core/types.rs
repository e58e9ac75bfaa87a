//! core::types
//!
//! Strong types for store identifiers and parent references.
//!
//! # Types
//!
//! - [`NodeId`] - Store-assigned node identifier
//! - [`TypeId`] - Store-assigned type identifier
//! - [`ParentRef`] - Reference to a parent entity by id or by name
//!
//! # Invariants
//!
//! Identifiers are only ever produced by the store. The client never
//! fabricates them; it only carries them back on later calls.
//!
//! # Examples
//!
//! ```
//! use model_registry::core::types::{NodeId, ParentRef};
//!
//! let id = NodeId::new(7);
//! assert_eq!(id.to_string(), "7");
//!
//! let by_name = ParentRef::from("iris-classifier");
//! assert_eq!(by_name.as_id(), None);
//! assert_eq!(ParentRef::from(id).as_id(), Some(id));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from identifier parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier '{0}': expected a non-negative integer")]
    InvalidId(String),
}

/// A store-assigned node identifier.
///
/// Node ids are immutable once assigned. They serialize as plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw store identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidId(s.to_string()))
    }
}

/// A store-assigned type identifier.
///
/// Resolved once per type name per client session by the type cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(u64);

impl TypeId {
    /// Wrap a raw store identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TypeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidId(s.to_string()))
    }
}

/// Reference to a parent entity.
///
/// Callers may name a parent either by its store id or by its unique name.
/// Name references are resolved to ids before any scoped lookup happens;
/// entities reconstructed from the store always carry [`ParentRef::Id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentRef {
    /// Parent identified by its store id
    Id(NodeId),
    /// Parent identified by its unique name
    Name(String),
}

impl ParentRef {
    /// Get the parent id if this reference is already resolved.
    pub fn as_id(&self) -> Option<NodeId> {
        match self {
            ParentRef::Id(id) => Some(*id),
            ParentRef::Name(_) => None,
        }
    }
}

impl From<NodeId> for ParentRef {
    fn from(id: NodeId) -> Self {
        ParentRef::Id(id)
    }
}

impl From<&str> for ParentRef {
    fn from(name: &str) -> Self {
        ParentRef::Name(name.to_string())
    }
}

impl From<String> for ParentRef {
    fn from(name: String) -> Self {
        ParentRef::Name(name)
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentRef::Id(id) => write!(f, "id {}", id),
            ParentRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}
