//! registry::entities
//!
//! Domain entities: registered models, model versions, and model artifacts.
//!
//! # Identity
//!
//! - [`RegisteredModel`]: unique name, store-wide
//! - [`ModelVersion`]: version name, unique within its parent model
//! - [`ModelArtifact`]: artifact name, unique within its parent version
//!
//! Ids and timestamps are assigned by the store. A freshly built entity has
//! neither; an entity returned by the registry has both.
//!
//! # Example
//!
//! ```
//! use model_registry::registry::{ModelVersion, RegisteredModel, RegisteredModelState};
//!
//! let model = RegisteredModel::new("iris")
//!     .with_owner("data-science")
//!     .with_state(RegisteredModelState::Live)
//!     .with_custom_property("team", "forecasting");
//!
//! let version = ModelVersion::new("iris", "v1").with_author("alice");
//! assert!(model.id.is_none());
//! assert_eq!(version.parent.to_string(), "'iris'");
//! ```

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::core::types::{NodeId, ParentRef};
use crate::core::value::{Properties, PropertyValue};

/// Error from parsing an enum from its wire string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    /// Which enum was being parsed
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All variants, in declaration order.
            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }

            /// The string written to the store.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// Lifecycle state of a registered model.
    RegisteredModelState, "registered model state" {
        Live => "LIVE",
        Archived => "ARCHIVED",
    }
}

wire_enum! {
    /// Lifecycle state of a model version.
    ModelVersionState, "model version state" {
        Live => "LIVE",
        Archived => "ARCHIVED",
    }
}

wire_enum! {
    /// Lifecycle state of an artifact.
    ArtifactState, "artifact state" {
        Unknown => "UNKNOWN",
        Pending => "PENDING",
        Live => "LIVE",
        MarkedForDeletion => "MARKED_FOR_DELETION",
        Deleted => "DELETED",
        Abandoned => "ABANDONED",
        Reference => "REFERENCE",
    }
}

wire_enum! {
    /// What an artifact holds.
    ArtifactKind, "artifact kind" {
        ModelArtifact => "model-artifact",
        DocArtifact => "doc-artifact",
        Metric => "metric",
        Dataset => "dataset",
        Parameter => "parameter",
    }
}

impl Default for ArtifactKind {
    fn default() -> Self {
        ArtifactKind::ModelArtifact
    }
}

fn to_datetime(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// A named model, the root of the registry hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredModel {
    /// Store-assigned id
    pub id: Option<NodeId>,
    /// Unique name; immutable once registered
    pub name: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub state: Option<RegisteredModelState>,
    /// Caller extension data
    pub custom_properties: Properties,
    pub create_time_since_epoch: Option<i64>,
    pub last_update_time_since_epoch: Option<i64>,
}

impl RegisteredModel {
    /// Create a model with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            owner: None,
            state: None,
            custom_properties: Properties::new(),
            create_time_since_epoch: None,
            last_update_time_since_epoch: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_state(mut self, state: RegisteredModelState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_custom_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.custom_properties.insert(key.into(), value.into());
        self
    }

    /// Creation time, if the store has assigned one.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.create_time_since_epoch)
    }

    /// Last update time, if the store has assigned one.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.last_update_time_since_epoch)
    }
}

/// A version of a registered model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVersion {
    pub id: Option<NodeId>,
    /// Parent model, by id or by name
    pub parent: ParentRef,
    /// Version name, unique within the parent
    pub name: String,
    pub state: Option<ModelVersionState>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub custom_properties: Properties,
    pub create_time_since_epoch: Option<i64>,
    pub last_update_time_since_epoch: Option<i64>,
}

impl ModelVersion {
    /// Create a version of `parent` named `name`.
    pub fn new(parent: impl Into<ParentRef>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            parent: parent.into(),
            name: name.into(),
            state: None,
            description: None,
            author: None,
            custom_properties: Properties::new(),
            create_time_since_epoch: None,
            last_update_time_since_epoch: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_state(mut self, state: ModelVersionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_custom_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.custom_properties.insert(key.into(), value.into());
        self
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.create_time_since_epoch)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.last_update_time_since_epoch)
    }
}

/// A stored artifact attached to a model version.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub id: Option<NodeId>,
    /// Parent version id
    pub model_version: NodeId,
    /// Artifact name, unique within the parent version
    pub name: String,
    /// Location of the artifact bytes
    pub uri: Option<String>,
    pub kind: ArtifactKind,
    pub state: Option<ArtifactState>,
    pub description: Option<String>,
    pub model_format_name: Option<String>,
    pub model_format_version: Option<String>,
    pub storage_key: Option<String>,
    pub storage_path: Option<String>,
    pub service_account_name: Option<String>,
    /// Identifier from the caller's own system; the store keeps it unique
    pub external_id: Option<String>,
    pub custom_properties: Properties,
    pub create_time_since_epoch: Option<i64>,
    pub last_update_time_since_epoch: Option<i64>,
}

impl ModelArtifact {
    /// Create a `model-artifact` named `name` under `model_version`.
    pub fn new(model_version: NodeId, name: impl Into<String>) -> Self {
        Self {
            id: None,
            model_version,
            name: name.into(),
            uri: None,
            kind: ArtifactKind::default(),
            state: None,
            description: None,
            model_format_name: None,
            model_format_version: None,
            storage_key: None,
            storage_path: None,
            service_account_name: None,
            external_id: None,
            custom_properties: Properties::new(),
            create_time_since_epoch: None,
            last_update_time_since_epoch: None,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_kind(mut self, kind: ArtifactKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_state(mut self, state: ArtifactState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the serialization format, e.g. `("onnx", "1")`.
    pub fn with_model_format(
        mut self,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.model_format_name = Some(name.into());
        self.model_format_version = Some(version.into());
        self
    }

    /// Set the storage credentials key and path within that storage.
    pub fn with_storage(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self.storage_path = Some(path.into());
        self
    }

    pub fn with_service_account_name(mut self, name: impl Into<String>) -> Self {
        self.service_account_name = Some(name.into());
        self
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_custom_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.custom_properties.insert(key.into(), value.into());
        self
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.create_time_since_epoch)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.last_update_time_since_epoch)
    }
}
