//! core::value
//!
//! Tagged property values stored on nodes.
//!
//! # Wire Shape
//!
//! A [`PropertyValue`] serializes as `{"kind": <kind>, "value": <value>}` where
//! `kind` is one of `int`, `double`, `string`, `struct`.
//!
//! ```
//! use model_registry::core::value::PropertyValue;
//!
//! let json = serde_json::to_string(&PropertyValue::Int(3)).unwrap();
//! assert_eq!(json, r#"{"kind":"int","value":3}"#);
//! ```
//!
//! # Numeric Coercion
//!
//! Conversions into `PropertyValue` never lose precision. Unsigned 64-bit
//! values above `i64::MAX` are rejected instead of wrapped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Property map keyed by property name.
///
/// Ordered so that node payloads serialize deterministically.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Errors from value conversion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("value {0} does not fit in a 64-bit signed integer")]
    IntOverflow(u64),

    #[error("struct value must be a JSON object, got {0}")]
    NotAnObject(String),
}

/// The kind of a property value, as declared in a type schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Int,
    Double,
    String,
    Struct,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Int => write!(f, "int"),
            PropertyKind::Double => write!(f, "double"),
            PropertyKind::String => write!(f, "string"),
            PropertyKind::Struct => write!(f, "struct"),
        }
    }
}

/// A single scalar or structured property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    /// 64-bit signed integer
    Int(i64),
    /// IEEE-754 double
    Double(f64),
    /// UTF-8 string, passed through unmodified
    String(String),
    /// Structured blob (always a JSON object)
    Struct(serde_json::Map<String, serde_json::Value>),
}

impl PropertyValue {
    /// Get the kind tag of this value.
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Int(_) => PropertyKind::Int,
            PropertyValue::Double(_) => PropertyKind::Double,
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Struct(_) => PropertyKind::Struct,
        }
    }

    /// Build a struct value from arbitrary JSON.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::NotAnObject` unless `value` is a JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValueError> {
        match value {
            serde_json::Value::Object(map) => Ok(PropertyValue::Struct(map)),
            other => Err(ValueError::NotAnObject(other.to_string())),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            PropertyValue::Struct(m) => Some(m),
            _ => None,
        }
    }
}

macro_rules! lossless_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PropertyValue {
                fn from(v: $t) -> Self {
                    PropertyValue::Int(i64::from(v))
                }
            }
        )*
    };
}

lossless_int!(i8, i16, i32, i64, u8, u16, u32);

impl TryFrom<u64> for PropertyValue {
    type Error = ValueError;

    fn try_from(v: u64) -> Result<Self, Self::Error> {
        i64::try_from(v)
            .map(PropertyValue::Int)
            .map_err(|_| ValueError::IntOverflow(v))
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        PropertyValue::Double(f64::from(v))
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for PropertyValue {
    fn from(v: serde_json::Map<String, serde_json::Value>) -> Self {
        PropertyValue::Struct(v)
    }
}
