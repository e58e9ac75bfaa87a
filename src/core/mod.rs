//! core
//!
//! Core value types and configuration for the registry client.
//!
//! # Modules
//!
//! - [`types`] - Strong types: NodeId, TypeId, ParentRef
//! - [`value`] - Tagged property values and their kinds
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Numeric conversions are exact or fail

pub mod config;
pub mod types;
pub mod value;
