//! store::mock
//!
//! In-memory metadata store for deterministic testing and local use.
//!
//! # Design
//!
//! The mock store keeps types and nodes in memory and enforces the parts of
//! the store contract the registry relies on:
//! - type names are unique; `create_type` on a taken name is `AlreadyExists`
//! - node names are unique per (type, scope); duplicates are `AlreadyExists`
//! - declared properties must match the type schema (`InvalidArgument`)
//! - ids are assigned by the store, sequentially from 1
//!
//! Every call is recorded so tests can count round trips, and failures or
//! creation races can be injected.
//!
//! # Example
//!
//! ```
//! use model_registry::store::mock::MockStore;
//! use model_registry::store::{CallOptions, MetadataStore, NodeCategory, TypeSchema};
//!
//! # tokio_test::block_on(async {
//! let store = MockStore::new();
//! let opts = CallOptions::default();
//!
//! let type_id = store
//!     .create_type(
//!         TypeSchema {
//!             id: None,
//!             name: "kf.RegisteredModel".to_string(),
//!             category: NodeCategory::Container,
//!             properties: Default::default(),
//!         },
//!         &opts,
//!     )
//!     .await
//!     .unwrap();
//!
//! let schema = store.get_type_by_name("kf.RegisteredModel", &opts).await.unwrap();
//! assert_eq!(schema.id, Some(type_id));
//! # });
//! ```

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::traits::{
    name_matches, CallOptions, ListPage, ListRequest, MetadataStore, OrderBy, PropertyDelta,
    SortOrder, StoreError, TypeSchema, TypedNode,
};
use crate::core::types::{NodeId, TypeId};
use crate::core::value::Properties;

/// In-memory metadata store.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

#[derive(Debug)]
struct MockStoreInner {
    /// Types by id.
    types: BTreeMap<TypeId, TypeSchema>,
    /// Nodes by id.
    nodes: BTreeMap<NodeId, TypedNode>,
    next_type_id: u64,
    next_node_id: u64,
    /// Logical clock for timestamps, so ordering by time is deterministic.
    last_timestamp: i64,
    fail_on: Option<FailOn>,
    /// Number of upcoming `create_node` calls that lose a simulated race.
    create_node_races: usize,
    /// Number of upcoming `create_type` calls that lose a simulated race.
    create_type_races: usize,
    operations: Vec<StoreOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetTypeByName(StoreError),
    CreateType(StoreError),
    GetNodeByName(StoreError),
    GetNode(StoreError),
    CreateNode(StoreError),
    UpdateNode(StoreError),
    ListNodes(StoreError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOperation {
    GetTypeByName {
        name: String,
    },
    CreateType {
        name: String,
    },
    GetNodeByName {
        type_id: TypeId,
        name: String,
        scope: Option<NodeId>,
    },
    GetNode {
        id: NodeId,
    },
    CreateNode {
        type_id: TypeId,
        name: String,
        scope: Option<NodeId>,
    },
    UpdateNode {
        id: NodeId,
        delta: PropertyDelta,
    },
    ListNodes {
        type_id: TypeId,
        scope: Option<NodeId>,
        page_token: Option<String>,
        page_size: usize,
    },
}

impl StoreOperation {
    /// Short verb name, handy for counting.
    pub fn verb(&self) -> &'static str {
        match self {
            StoreOperation::GetTypeByName { .. } => "get_type_by_name",
            StoreOperation::CreateType { .. } => "create_type",
            StoreOperation::GetNodeByName { .. } => "get_node_by_name",
            StoreOperation::GetNode { .. } => "get_node",
            StoreOperation::CreateNode { .. } => "create_node",
            StoreOperation::UpdateNode { .. } => "update_node",
            StoreOperation::ListNodes { .. } => "list_nodes",
        }
    }
}

impl MockStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockStoreInner {
                types: BTreeMap::new(),
                nodes: BTreeMap::new(),
                next_type_id: 1,
                next_node_id: 1,
                last_timestamp: 0,
                fail_on: None,
                create_node_races: 0,
                create_type_races: 0,
                operations: Vec::new(),
            })),
        }
    }

    /// Create a store with pre-registered types.
    ///
    /// Useful for simulating a store whose schemas were registered by
    /// another client, possibly with a different shape.
    pub fn with_types(types: Vec<TypeSchema>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            for mut schema in types {
                let id = inner.allocate_type_id();
                schema.id = Some(id);
                inner.types.insert(id, schema);
            }
        }
        store
    }

    /// Configure the store to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use model_registry::store::mock::{FailOn, MockStore};
    /// use model_registry::store::StoreError;
    ///
    /// let store = MockStore::new()
    ///     .fail_on(FailOn::CreateNode(StoreError::Unavailable("down".into())));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.inner.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.inner.lock().fail_on = None;
    }

    /// Make the next `count` calls to `create_node` lose a race.
    ///
    /// A losing call stores the node as if a concurrent creator had just
    /// written it, then reports `AlreadyExists`.
    pub fn race_create_node(&self, count: usize) {
        self.inner.lock().create_node_races = count;
    }

    /// Make the next `count` calls to `create_type` lose a race.
    pub fn race_create_type(&self, count: usize) {
        self.inner.lock().create_type_races = count;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.inner.lock().operations.clone()
    }

    /// Count recorded operations with the given verb name.
    pub fn count(&self, verb: &str) -> usize {
        self.inner
            .lock()
            .operations
            .iter()
            .filter(|op| op.verb() == verb)
            .count()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.inner.lock().operations.clear();
    }

    /// Get a node by id without recording an operation.
    pub fn node(&self, id: NodeId) -> Option<TypedNode> {
        self.inner.lock().nodes.get(&id).cloned()
    }

    /// Get the number of stored nodes.
    pub fn node_count(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    /// Remove a node, as another client deleting it would.
    pub fn remove_node(&self, id: NodeId) -> Option<TypedNode> {
        self.inner.lock().nodes.remove(&id)
    }

    fn record(&self, op: StoreOperation) {
        self.inner.lock().operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Result<(), StoreError> {
        let inner = self.inner.lock();
        let err = match &inner.fail_on {
            Some(FailOn::GetTypeByName(e)) if expected == "get_type_by_name" => e,
            Some(FailOn::CreateType(e)) if expected == "create_type" => e,
            Some(FailOn::GetNodeByName(e)) if expected == "get_node_by_name" => e,
            Some(FailOn::GetNode(e)) if expected == "get_node" => e,
            Some(FailOn::CreateNode(e)) if expected == "create_node" => e,
            Some(FailOn::UpdateNode(e)) if expected == "update_node" => e,
            Some(FailOn::ListNodes(e)) if expected == "list_nodes" => e,
            _ => return Ok(()),
        };
        Err(err.clone())
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStoreInner {
    fn allocate_type_id(&mut self) -> TypeId {
        let id = TypeId::new(self.next_type_id);
        self.next_type_id += 1;
        id
    }

    fn allocate_node_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// Strictly increasing millisecond timestamp.
    fn tick(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis().max(self.last_timestamp + 1);
        self.last_timestamp = now;
        now
    }

    fn find_by_name(&self, type_id: TypeId, name: &str, scope: Option<NodeId>) -> Option<&TypedNode> {
        self.nodes
            .values()
            .find(|n| n.type_id == type_id && n.name == name && n.scope == scope)
    }

    /// Check declared properties against the type schema.
    fn validate_properties(&self, type_id: TypeId, props: &Properties) -> Result<(), StoreError> {
        let schema = self
            .types
            .get(&type_id)
            .ok_or_else(|| StoreError::InvalidArgument(format!("unknown type id {}", type_id)))?;

        for (key, value) in props {
            match schema.properties.get(key) {
                None => {
                    return Err(StoreError::InvalidArgument(format!(
                        "property '{}' is not declared by type '{}'",
                        key, schema.name
                    )))
                }
                Some(kind) if *kind != value.kind() => {
                    return Err(StoreError::InvalidArgument(format!(
                        "property '{}' of type '{}' expects {}, got {}",
                        key,
                        schema.name,
                        kind,
                        value.kind()
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for MockStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_type_by_name(
        &self,
        name: &str,
        _opts: &CallOptions,
    ) -> Result<TypeSchema, StoreError> {
        self.record(StoreOperation::GetTypeByName {
            name: name.to_string(),
        });
        self.check_fail("get_type_by_name")?;

        let inner = self.inner.lock();
        inner
            .types
            .values()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("type '{}'", name)))
    }

    async fn create_type(
        &self,
        schema: TypeSchema,
        _opts: &CallOptions,
    ) -> Result<TypeId, StoreError> {
        self.record(StoreOperation::CreateType {
            name: schema.name.clone(),
        });
        self.check_fail("create_type")?;

        let mut inner = self.inner.lock();
        if inner.types.values().any(|t| t.name == schema.name) {
            return Err(StoreError::AlreadyExists(format!("type '{}'", schema.name)));
        }

        let id = inner.allocate_type_id();
        let name = schema.name.clone();
        inner.types.insert(
            id,
            TypeSchema {
                id: Some(id),
                ..schema
            },
        );

        if inner.create_type_races > 0 {
            inner.create_type_races -= 1;
            return Err(StoreError::AlreadyExists(format!("type '{}'", name)));
        }
        Ok(id)
    }

    async fn get_node_by_name(
        &self,
        type_id: TypeId,
        name: &str,
        scope: Option<NodeId>,
        _opts: &CallOptions,
    ) -> Result<TypedNode, StoreError> {
        self.record(StoreOperation::GetNodeByName {
            type_id,
            name: name.to_string(),
            scope,
        });
        self.check_fail("get_node_by_name")?;

        let inner = self.inner.lock();
        inner
            .find_by_name(type_id, name, scope)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("node '{}' of type {}", name, type_id)))
    }

    async fn get_node(&self, id: NodeId, _opts: &CallOptions) -> Result<TypedNode, StoreError> {
        self.record(StoreOperation::GetNode { id });
        self.check_fail("get_node")?;

        let inner = self.inner.lock();
        inner
            .nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("node {}", id)))
    }

    async fn create_node(
        &self,
        node: TypedNode,
        _opts: &CallOptions,
    ) -> Result<NodeId, StoreError> {
        self.record(StoreOperation::CreateNode {
            type_id: node.type_id,
            name: node.name.clone(),
            scope: node.scope,
        });
        self.check_fail("create_node")?;

        let mut inner = self.inner.lock();
        if node.id.is_some() {
            return Err(StoreError::InvalidArgument(
                "node ids are assigned by the store".into(),
            ));
        }
        match inner.types.get(&node.type_id) {
            Some(schema) if schema.category != node.category => {
                return Err(StoreError::InvalidArgument(format!(
                    "type '{}' holds {} nodes, got {}",
                    schema.name, schema.category, node.category
                )))
            }
            _ => {}
        }
        inner.validate_properties(node.type_id, &node.properties)?;

        if inner
            .find_by_name(node.type_id, &node.name, node.scope)
            .is_some()
        {
            return Err(StoreError::AlreadyExists(format!("node '{}'", node.name)));
        }

        let id = inner.allocate_node_id();
        let now = inner.tick();
        let name = node.name.clone();
        inner.nodes.insert(
            id,
            TypedNode {
                id: Some(id),
                create_time_since_epoch: Some(now),
                last_update_time_since_epoch: Some(now),
                ..node
            },
        );

        if inner.create_node_races > 0 {
            inner.create_node_races -= 1;
            return Err(StoreError::AlreadyExists(format!("node '{}'", name)));
        }
        Ok(id)
    }

    async fn update_node(
        &self,
        id: NodeId,
        delta: PropertyDelta,
        _opts: &CallOptions,
    ) -> Result<(), StoreError> {
        self.record(StoreOperation::UpdateNode {
            id,
            delta: delta.clone(),
        });
        self.check_fail("update_node")?;

        let mut inner = self.inner.lock();
        let type_id = inner
            .nodes
            .get(&id)
            .map(|n| n.type_id)
            .ok_or_else(|| StoreError::NotFound(format!("node {}", id)))?;
        inner.validate_properties(type_id, &delta.properties)?;

        let now = inner.tick();
        if let Some(node) = inner.nodes.get_mut(&id) {
            node.properties.extend(delta.properties);
            node.custom_properties.extend(delta.custom_properties);
            node.last_update_time_since_epoch = Some(now);
        }
        Ok(())
    }

    async fn list_nodes(
        &self,
        request: ListRequest,
        _opts: &CallOptions,
    ) -> Result<ListPage, StoreError> {
        self.record(StoreOperation::ListNodes {
            type_id: request.type_id,
            scope: request.scope,
            page_token: request.page_token.clone(),
            page_size: request.page_size,
        });
        self.check_fail("list_nodes")?;

        let offset = match &request.page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::InvalidArgument(format!("bad page token '{}'", token)))?,
            None => 0,
        };

        let inner = self.inner.lock();
        let mut matching: Vec<&TypedNode> = inner
            .nodes
            .values()
            .filter(|n| n.type_id == request.type_id)
            .filter(|n| request.scope.is_none() || n.scope == request.scope)
            .filter(|n| match &request.name_pattern {
                Some(pattern) => name_matches(pattern, &n.name),
                None => true,
            })
            .collect();

        matching.sort_by_key(|n| match request.order_by {
            OrderBy::Id => (0, n.id),
            OrderBy::CreateTime => (n.create_time_since_epoch.unwrap_or_default(), n.id),
            OrderBy::LastUpdateTime => (n.last_update_time_since_epoch.unwrap_or_default(), n.id),
        });
        if request.sort_order == SortOrder::Desc {
            matching.reverse();
        }

        let page_size = request.page_size.max(1);
        let end = (offset + page_size).min(matching.len());
        let items: Vec<TypedNode> = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|n| (*n).clone())
            .collect();
        let next_page_token = (end < matching.len()).then(|| end.to_string());

        Ok(ListPage {
            items,
            next_page_token,
        })
    }
}
