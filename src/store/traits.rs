//! store::traits
//!
//! Metadata store trait definition and the store's generic primitives.
//!
//! # Design
//!
//! The `MetadataStore` trait is async because every verb involves network
//! I/O in production. All methods return `Result` and take a
//! [`CallOptions`] carrying the per-call deadline, which implementations
//! pass through to their transport unchanged.
//!
//! The store vocabulary is deliberately generic: typed nodes with property
//! maps, type schemas, and token pagination. Nothing in this module knows
//! about models or versions.
//!
//! # Example
//!
//! ```ignore
//! use model_registry::store::{CallOptions, MetadataStore, StoreError};
//!
//! async fn type_exists(store: &dyn MetadataStore, name: &str) -> Result<bool, StoreError> {
//!     match store.get_type_by_name(name, &CallOptions::default()).await {
//!         Ok(_) => Ok(true),
//!         Err(StoreError::NotFound(_)) => Ok(false),
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::core::types::{NodeId, TypeId};
use crate::core::value::{Properties, PropertyKind};

/// Errors from store operations.
///
/// These map to the failure modes of the remote metadata store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The requested type or node does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A type or node with the same unique name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The store rejected the request payload (undeclared property, kind mismatch, bad token).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The per-call deadline elapsed before the store answered.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The store could not be reached or is temporarily unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other error reported by the store.
    #[error("store error: {status} - {message}")]
    Api {
        /// Transport status code
        status: u16,
        /// Error message from the store
        message: String,
    },
}

impl StoreError {
    /// Check whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::DeadlineExceeded(_) | StoreError::Unavailable(_)
        )
    }
}

/// Per-call options passed through to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Deadline for a single store call. `None` leaves the transport default.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Options with the given per-call deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Node category.
///
/// Containers may have children (models, versions); leaves may not (artifacts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Container,
    Leaf,
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeCategory::Container => write!(f, "container"),
            NodeCategory::Leaf => write!(f, "leaf"),
        }
    }
}

/// A type schema registered in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSchema {
    /// Store-assigned id (absent on create requests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TypeId>,
    /// Unique type name, e.g. `kf.RegisteredModel`
    pub name: String,
    /// Category of nodes of this type
    pub category: NodeCategory,
    /// Declared property keys and their value kinds
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyKind>,
}

/// A generic typed node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedNode {
    /// Store-assigned id (absent until created)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    /// Type of this node
    pub type_id: TypeId,
    /// Container or leaf
    pub category: NodeCategory,
    /// Name, unique within (type, scope)
    pub name: String,
    /// Parent node id for scoped names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<NodeId>,
    /// Schema-declared properties
    #[serde(default)]
    pub properties: Properties,
    /// Free-form properties not checked against the schema
    #[serde(default)]
    pub custom_properties: Properties,
    /// Creation time in milliseconds since the epoch (store-assigned)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time_since_epoch: Option<i64>,
    /// Last update time in milliseconds since the epoch (store-assigned)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time_since_epoch: Option<i64>,
}

/// Properties to merge onto an existing node.
///
/// Keys present here overwrite stored values; keys absent here are left
/// untouched. A delta never deletes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDelta {
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub custom_properties: Properties,
}

impl PropertyDelta {
    /// Check whether applying this delta would change nothing.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.custom_properties.is_empty()
    }
}

/// Field used to order list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    Id,
    CreateTime,
    LastUpdateTime,
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBy::Id => write!(f, "ID"),
            OrderBy::CreateTime => write!(f, "CREATE_TIME"),
            OrderBy::LastUpdateTime => write!(f, "LAST_UPDATE_TIME"),
        }
    }
}

/// Sort direction for list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "ASC"),
            SortOrder::Desc => write!(f, "DESC"),
        }
    }
}

/// Request for one page of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    /// Type of nodes to list
    pub type_id: TypeId,
    /// Restrict to children of this node
    pub scope: Option<NodeId>,
    /// Name filter; `*` matches any run of characters
    pub name_pattern: Option<String>,
    /// Ordering field
    pub order_by: OrderBy,
    /// Ordering direction
    pub sort_order: SortOrder,
    /// Opaque continuation token from a previous page
    pub page_token: Option<String>,
    /// Maximum number of items to return
    pub page_size: usize,
}

/// One page of list results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    #[serde(default)]
    pub items: Vec<TypedNode>,
    /// Continuation token; `None` means this was the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Match a name against a pattern where `*` matches any run of characters.
///
/// # Example
///
/// ```
/// use model_registry::store::name_matches;
///
/// assert!(name_matches("iris-*", "iris-classifier"));
/// assert!(name_matches("*onnx", "model.onnx"));
/// assert!(!name_matches("iris", "iris-classifier"));
/// ```
pub fn name_matches(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !name.starts_with(first) || name.len() < first.len() + last.len() {
        return false;
    }
    if !name[first.len()..].ends_with(last) {
        return false;
    }

    let mut rest = &name[first.len()..name.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}

/// The metadata store transport.
///
/// Implementations must be `Send + Sync` so a single store can be shared
/// by every caller of a client.
///
/// # Error Handling
///
/// All methods return `Result<T, StoreError>`. The registry core relies on:
/// - `NotFound` as a branch signal for lookups
/// - `AlreadyExists` from `create_type` / `create_node` when a concurrent
///   creator won the race for the same unique name
/// - `InvalidArgument` when a payload violates the type schema
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Get the store name (e.g., "http", "memory").
    fn name(&self) -> &'static str;

    /// Look up a type schema by its unique name.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no type has this name
    async fn get_type_by_name(
        &self,
        name: &str,
        opts: &CallOptions,
    ) -> Result<TypeSchema, StoreError>;

    /// Register a new type schema.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if a type with the same name exists
    async fn create_type(&self, schema: TypeSchema, opts: &CallOptions)
        -> Result<TypeId, StoreError>;

    /// Look up a node by type, name and scope.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no node matches
    async fn get_node_by_name(
        &self,
        type_id: TypeId,
        name: &str,
        scope: Option<NodeId>,
        opts: &CallOptions,
    ) -> Result<TypedNode, StoreError>;

    /// Look up a node by id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no node has this id
    async fn get_node(&self, id: NodeId, opts: &CallOptions) -> Result<TypedNode, StoreError>;

    /// Create a node. The node must not carry an id.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if a node with the same (type, scope, name) exists
    /// - `InvalidArgument` if properties violate the type schema
    async fn create_node(&self, node: TypedNode, opts: &CallOptions)
        -> Result<NodeId, StoreError>;

    /// Merge a property delta onto an existing node.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node doesn't exist
    /// - `InvalidArgument` if properties violate the type schema
    async fn update_node(
        &self,
        id: NodeId,
        delta: PropertyDelta,
        opts: &CallOptions,
    ) -> Result<(), StoreError>;

    /// List one page of nodes.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the page token is not one this store issued
    async fn list_nodes(
        &self,
        request: ListRequest,
        opts: &CallOptions,
    ) -> Result<ListPage, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::PropertyValue;

    #[test]
    fn store_error_display() {
        assert_eq!(
            format!("{}", StoreError::NotFound("type kf.X".into())),
            "not found: type kf.X"
        );
        assert_eq!(
            format!(
                "{}",
                StoreError::Api {
                    status: 500,
                    message: "boom".into()
                }
            ),
            "store error: 500 - boom"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(StoreError::Unavailable("down".into()).is_transient());
        assert!(StoreError::DeadlineExceeded("slow".into()).is_transient());
        assert!(!StoreError::NotFound("x".into()).is_transient());
        assert!(!StoreError::AlreadyExists("x".into()).is_transient());
    }

    #[test]
    fn property_delta_is_empty() {
        let mut delta = PropertyDelta::default();
        assert!(delta.is_empty());
        delta
            .custom_properties
            .insert("k".into(), PropertyValue::from("v"));
        assert!(!delta.is_empty());
    }

    #[test]
    fn node_serializes_camel_case() {
        let node = TypedNode {
            id: None,
            type_id: TypeId::new(1),
            category: NodeCategory::Leaf,
            name: "model.onnx".into(),
            scope: Some(NodeId::new(2)),
            properties: Properties::new(),
            custom_properties: Properties::new(),
            create_time_since_epoch: None,
            last_update_time_since_epoch: None,
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["typeId"], 1);
        assert_eq!(json["scope"], 2);
        assert_eq!(json["category"], "leaf");
        assert!(json.get("id").is_none());
    }

    mod name_matching {
        use super::*;

        #[test]
        fn exact() {
            assert!(name_matches("v1", "v1"));
            assert!(!name_matches("v1", "v10"));
        }

        #[test]
        fn wildcards() {
            assert!(name_matches("*", "anything"));
            assert!(name_matches("v*", "v10"));
            assert!(name_matches("*-classifier", "iris-classifier"));
            assert!(name_matches("a*c*e", "abcde"));
            assert!(!name_matches("a*c*e", "abde"));
            assert!(!name_matches("ab*ba", "aba"));
        }
    }

    #[test]
    fn order_display() {
        assert_eq!(OrderBy::default().to_string(), "ID");
        assert_eq!(OrderBy::LastUpdateTime.to_string(), "LAST_UPDATE_TIME");
        assert_eq!(SortOrder::Desc.to_string(), "DESC");
    }
}
