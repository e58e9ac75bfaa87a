//! registry::mapping
//!
//! Bidirectional conversion between domain entities and store nodes.
//!
//! # Mapping Tables
//!
//! Each entity kind has one fixed [`MappingTable`]: the store type name, the
//! node category, the parent table (for scoped names), a mapping version and
//! the declared `(property key, kind)` pairs. The table doubles as the type
//! schema the registry registers when the type is missing from the store.
//!
//! # Conversion Rules
//!
//! [`to_primitive`] writes only fields that are present; it never writes a
//! null. Custom properties go to the node's custom property bag untouched.
//!
//! [`from_primitive`] is the inverse. A declared property that the table does
//! not map (a newer schema may add some) is folded into the entity's custom
//! properties rather than dropped. When the node also carries a custom
//! property of the same key, the declared value wins: reconcile writes such
//! keys to the declared map, so that is the value callers last set. A mapped property of the wrong kind, an
//! unknown enum string, a missing scope on a scoped type, or a node of a
//! different type is a [`MappingError`].
//!
//! Both functions are pure.
//!
//! # Example
//!
//! ```
//! use model_registry::core::types::TypeId;
//! use model_registry::registry::mapping::{from_primitive, to_primitive};
//! use model_registry::registry::RegisteredModel;
//!
//! let model = RegisteredModel::new("iris").with_owner("data-science");
//! let node = to_primitive(&model, TypeId::new(1));
//! assert_eq!(node.properties.len(), 1);
//!
//! let back: RegisteredModel = from_primitive(&node, TypeId::new(1)).unwrap();
//! assert_eq!(back, model);
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

use super::entities::{ArtifactKind, ModelArtifact, ModelVersion, RegisteredModel};
use crate::core::types::{NodeId, ParentRef, TypeId};
use crate::core::value::{Properties, PropertyKind, PropertyValue};
use crate::store::{NodeCategory, TypeSchema, TypedNode};

/// Errors from mapping a stored node to a domain entity.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("node has type {found}, expected {type_name} (type {expected})")]
    TypeMismatch {
        type_name: &'static str,
        expected: TypeId,
        found: TypeId,
    },

    #[error("property '{key}' of {type_name} has kind {found}, expected {expected}")]
    WrongKind {
        type_name: &'static str,
        key: String,
        expected: PropertyKind,
        found: PropertyKind,
    },

    #[error("property '{key}' of {type_name} has unknown value '{value}'")]
    UnknownValue {
        type_name: &'static str,
        key: &'static str,
        value: String,
    },

    #[error("{type_name} node '{name}' has no parent scope")]
    MissingScope {
        type_name: &'static str,
        name: String,
    },

    #[error("{type_name} node '{name}' has no id")]
    MissingId {
        type_name: &'static str,
        name: String,
    },
}

/// Fixed description of how one entity kind maps onto store primitives.
#[derive(Debug)]
pub struct MappingTable {
    /// Store type name
    pub type_name: &'static str,
    /// Category of nodes of this type
    pub category: NodeCategory,
    /// Table of the parent entity, for types whose names are scoped
    pub parent: Option<&'static MappingTable>,
    /// Mapping version; bumped whenever `fields` changes
    pub version: u32,
    /// Declared property keys and kinds
    pub fields: &'static [(&'static str, PropertyKind)],
}

impl MappingTable {
    /// The type schema to register for this table.
    pub fn schema(&self) -> TypeSchema {
        TypeSchema {
            id: None,
            name: self.type_name.to_string(),
            category: self.category,
            properties: self
                .fields
                .iter()
                .map(|(key, kind)| (key.to_string(), *kind))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    /// Get the declared kind of a mapped key.
    pub fn kind_of(&self, key: &str) -> Option<PropertyKind> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, kind)| *kind)
    }

    /// Check whether names of this type are scoped by a parent.
    pub fn is_scoped(&self) -> bool {
        self.parent.is_some()
    }
}

pub mod keys {
    pub const DESCRIPTION: &str = "description";
    pub const OWNER: &str = "owner";
    pub const AUTHOR: &str = "author";
    pub const STATE: &str = "state";
    pub const URI: &str = "uri";
    pub const ARTIFACT_KIND: &str = "artifact_kind";
    pub const MODEL_FORMAT_NAME: &str = "model_format_name";
    pub const MODEL_FORMAT_VERSION: &str = "model_format_version";
    pub const STORAGE_KEY: &str = "storage_key";
    pub const STORAGE_PATH: &str = "storage_path";
    pub const SERVICE_ACCOUNT_NAME: &str = "service_account_name";
    pub const EXTERNAL_ID: &str = "external_id";
}

pub static REGISTERED_MODEL: MappingTable = MappingTable {
    type_name: "kf.RegisteredModel",
    category: NodeCategory::Container,
    parent: None,
    version: 1,
    fields: &[
        (keys::DESCRIPTION, PropertyKind::String),
        (keys::OWNER, PropertyKind::String),
        (keys::STATE, PropertyKind::String),
    ],
};

pub static MODEL_VERSION: MappingTable = MappingTable {
    type_name: "kf.ModelVersion",
    category: NodeCategory::Container,
    parent: Some(&REGISTERED_MODEL),
    version: 1,
    fields: &[
        (keys::DESCRIPTION, PropertyKind::String),
        (keys::AUTHOR, PropertyKind::String),
        (keys::STATE, PropertyKind::String),
    ],
};

pub static MODEL_ARTIFACT: MappingTable = MappingTable {
    type_name: "kf.ModelArtifact",
    category: NodeCategory::Leaf,
    parent: Some(&MODEL_VERSION),
    version: 2,
    fields: &[
        (keys::DESCRIPTION, PropertyKind::String),
        (keys::URI, PropertyKind::String),
        (keys::STATE, PropertyKind::String),
        (keys::ARTIFACT_KIND, PropertyKind::String),
        (keys::MODEL_FORMAT_NAME, PropertyKind::String),
        (keys::MODEL_FORMAT_VERSION, PropertyKind::String),
        (keys::STORAGE_KEY, PropertyKind::String),
        (keys::STORAGE_PATH, PropertyKind::String),
        (keys::SERVICE_ACCOUNT_NAME, PropertyKind::String),
        (keys::EXTERNAL_ID, PropertyKind::String),
    ],
};

/// Node contents handed to an entity during reconstruction.
///
/// Mapped properties have already been kind-checked against the table.
#[derive(Debug)]
pub struct NodeParts {
    table: &'static MappingTable,
    pub id: Option<NodeId>,
    pub name: String,
    pub scope: Option<NodeId>,
    mapped: Properties,
    /// Custom properties plus any declared properties the table does not map
    pub custom_properties: Properties,
    pub create_time_since_epoch: Option<i64>,
    pub last_update_time_since_epoch: Option<i64>,
}

impl NodeParts {
    /// Get a mapped string property.
    pub fn string(&self, key: &str) -> Option<String> {
        self.mapped
            .get(key)
            .and_then(PropertyValue::as_str)
            .map(str::to_string)
    }

    /// Parse a mapped string property into an enum.
    pub fn parse<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, MappingError> {
        match self.mapped.get(key).and_then(PropertyValue::as_str) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| MappingError::UnknownValue {
                type_name: self.table.type_name,
                key,
                value: raw.to_string(),
            }),
        }
    }

    /// Get the parent scope, which scoped types always carry.
    pub fn require_scope(&self) -> Result<NodeId, MappingError> {
        self.scope.ok_or_else(|| MappingError::MissingScope {
            type_name: self.table.type_name,
            name: self.name.clone(),
        })
    }
}

/// A domain entity with a fixed mapping onto store nodes.
pub trait Entity: Clone + Send + Sync + 'static {
    /// The mapping table for this entity kind.
    fn table() -> &'static MappingTable;

    fn id(&self) -> Option<NodeId>;

    fn name(&self) -> &str;

    /// The parent reference, for scoped kinds.
    fn parent(&self) -> Option<ParentRef>;

    fn custom_properties(&self) -> &Properties;

    /// Store-assigned (create, last update) timestamps.
    fn timestamps(&self) -> (Option<i64>, Option<i64>);

    /// Write every present mapped field into `properties`.
    fn write_properties(&self, properties: &mut Properties);

    /// Rebuild the entity from a checked node.
    fn from_parts(parts: NodeParts) -> Result<Self, MappingError>;
}

/// Convert an entity to a store node of type `type_id`.
pub fn to_primitive<E: Entity>(entity: &E, type_id: TypeId) -> TypedNode {
    let table = E::table();
    let mut properties = Properties::new();
    entity.write_properties(&mut properties);
    let (create_time, update_time) = entity.timestamps();

    TypedNode {
        id: entity.id(),
        type_id,
        category: table.category,
        name: entity.name().to_string(),
        scope: entity.parent().and_then(|p| p.as_id()),
        properties,
        custom_properties: entity.custom_properties().clone(),
        create_time_since_epoch: create_time,
        last_update_time_since_epoch: update_time,
    }
}

/// Convert a store node back into an entity.
///
/// # Errors
///
/// Returns a [`MappingError`] if the node has another type, lacks a required
/// scope, or carries a mapped property that cannot be read.
pub fn from_primitive<E: Entity>(node: &TypedNode, type_id: TypeId) -> Result<E, MappingError> {
    let table = E::table();
    if node.type_id != type_id {
        return Err(MappingError::TypeMismatch {
            type_name: table.type_name,
            expected: type_id,
            found: node.type_id,
        });
    }
    if table.is_scoped() && node.scope.is_none() {
        return Err(MappingError::MissingScope {
            type_name: table.type_name,
            name: node.name.clone(),
        });
    }

    let mut mapped = Properties::new();
    let mut custom_properties = node.custom_properties.clone();
    for (key, value) in &node.properties {
        match table.kind_of(key) {
            Some(kind) if kind == value.kind() => {
                mapped.insert(key.clone(), value.clone());
            }
            Some(kind) => {
                return Err(MappingError::WrongKind {
                    type_name: table.type_name,
                    key: key.clone(),
                    expected: kind,
                    found: value.kind(),
                })
            }
            // Declared but unmapped; overrides a custom value of the same key
            None => {
                custom_properties.insert(key.clone(), value.clone());
            }
        }
    }

    E::from_parts(NodeParts {
        table,
        id: node.id,
        name: node.name.clone(),
        scope: node.scope,
        mapped,
        custom_properties,
        create_time_since_epoch: node.create_time_since_epoch,
        last_update_time_since_epoch: node.last_update_time_since_epoch,
    })
}

fn put(properties: &mut Properties, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        properties.insert(key.to_string(), PropertyValue::from(value));
    }
}

impl Entity for RegisteredModel {
    fn table() -> &'static MappingTable {
        &REGISTERED_MODEL
    }

    fn id(&self) -> Option<NodeId> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<ParentRef> {
        None
    }

    fn custom_properties(&self) -> &Properties {
        &self.custom_properties
    }

    fn timestamps(&self) -> (Option<i64>, Option<i64>) {
        (self.create_time_since_epoch, self.last_update_time_since_epoch)
    }

    fn write_properties(&self, properties: &mut Properties) {
        put(properties, keys::DESCRIPTION, self.description.as_deref());
        put(properties, keys::OWNER, self.owner.as_deref());
        put(properties, keys::STATE, self.state.map(|s| s.as_str()));
    }

    fn from_parts(parts: NodeParts) -> Result<Self, MappingError> {
        let description = parts.string(keys::DESCRIPTION);
        let owner = parts.string(keys::OWNER);
        let state = parts.parse(keys::STATE)?;
        Ok(Self {
            id: parts.id,
            name: parts.name,
            description,
            owner,
            state,
            custom_properties: parts.custom_properties,
            create_time_since_epoch: parts.create_time_since_epoch,
            last_update_time_since_epoch: parts.last_update_time_since_epoch,
        })
    }
}

impl Entity for ModelVersion {
    fn table() -> &'static MappingTable {
        &MODEL_VERSION
    }

    fn id(&self) -> Option<NodeId> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<ParentRef> {
        Some(self.parent.clone())
    }

    fn custom_properties(&self) -> &Properties {
        &self.custom_properties
    }

    fn timestamps(&self) -> (Option<i64>, Option<i64>) {
        (self.create_time_since_epoch, self.last_update_time_since_epoch)
    }

    fn write_properties(&self, properties: &mut Properties) {
        put(properties, keys::DESCRIPTION, self.description.as_deref());
        put(properties, keys::AUTHOR, self.author.as_deref());
        put(properties, keys::STATE, self.state.map(|s| s.as_str()));
    }

    fn from_parts(parts: NodeParts) -> Result<Self, MappingError> {
        let parent = parts.require_scope()?;
        let description = parts.string(keys::DESCRIPTION);
        let author = parts.string(keys::AUTHOR);
        let state = parts.parse(keys::STATE)?;
        Ok(Self {
            id: parts.id,
            parent: ParentRef::Id(parent),
            name: parts.name,
            state,
            description,
            author,
            custom_properties: parts.custom_properties,
            create_time_since_epoch: parts.create_time_since_epoch,
            last_update_time_since_epoch: parts.last_update_time_since_epoch,
        })
    }
}

impl Entity for ModelArtifact {
    fn table() -> &'static MappingTable {
        &MODEL_ARTIFACT
    }

    fn id(&self) -> Option<NodeId> {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<ParentRef> {
        Some(ParentRef::Id(self.model_version))
    }

    fn custom_properties(&self) -> &Properties {
        &self.custom_properties
    }

    fn timestamps(&self) -> (Option<i64>, Option<i64>) {
        (self.create_time_since_epoch, self.last_update_time_since_epoch)
    }

    fn write_properties(&self, properties: &mut Properties) {
        put(properties, keys::DESCRIPTION, self.description.as_deref());
        put(properties, keys::URI, self.uri.as_deref());
        put(properties, keys::STATE, self.state.map(|s| s.as_str()));
        put(properties, keys::ARTIFACT_KIND, Some(self.kind.as_str()));
        put(
            properties,
            keys::MODEL_FORMAT_NAME,
            self.model_format_name.as_deref(),
        );
        put(
            properties,
            keys::MODEL_FORMAT_VERSION,
            self.model_format_version.as_deref(),
        );
        put(properties, keys::STORAGE_KEY, self.storage_key.as_deref());
        put(properties, keys::STORAGE_PATH, self.storage_path.as_deref());
        put(
            properties,
            keys::SERVICE_ACCOUNT_NAME,
            self.service_account_name.as_deref(),
        );
        put(properties, keys::EXTERNAL_ID, self.external_id.as_deref());
    }

    fn from_parts(parts: NodeParts) -> Result<Self, MappingError> {
        let model_version = parts.require_scope()?;
        let kind: Option<ArtifactKind> = parts.parse(keys::ARTIFACT_KIND)?;
        let state = parts.parse(keys::STATE)?;
        Ok(Self {
            id: parts.id,
            model_version,
            uri: parts.string(keys::URI),
            kind: kind.unwrap_or_default(),
            state,
            description: parts.string(keys::DESCRIPTION),
            model_format_name: parts.string(keys::MODEL_FORMAT_NAME),
            model_format_version: parts.string(keys::MODEL_FORMAT_VERSION),
            storage_key: parts.string(keys::STORAGE_KEY),
            storage_path: parts.string(keys::STORAGE_PATH),
            service_account_name: parts.string(keys::SERVICE_ACCOUNT_NAME),
            external_id: parts.string(keys::EXTERNAL_ID),
            custom_properties: parts.custom_properties,
            name: parts.name,
            create_time_since_epoch: parts.create_time_since_epoch,
            last_update_time_since_epoch: parts.last_update_time_since_epoch,
        })
    }
}
