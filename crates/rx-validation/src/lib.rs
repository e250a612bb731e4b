#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # rx-validation
//!
//! Rx core type engine: type registration, compilation, and data validation.
//!
//! Types are registered one at a time; a definition may only reference types
//! that are already registered, so callers must register in dependency order.
//!
//! ## Example Usage
//!
//! ```rust
//! use rx_schema::NamespaceRegistry;
//! use rx_validation::TypeRegistry;
//!
//! let mut namespaces = NamespaceRegistry::default();
//! namespaces.register_tag("/app");
//!
//! let tag: serde_yaml::Value = serde_yaml::from_str("type: //str").unwrap();
//! let root: serde_yaml::Value =
//!     serde_yaml::from_str("{type: //rec, required: {name: //str, tag: /app/Tag}}").unwrap();
//!
//! let mut types = TypeRegistry::new(&namespaces);
//! types.register_type("/app/Tag", &tag).unwrap();
//! types.register_type("/app", &root).unwrap();
//!
//! let validator = types.compile(&root).unwrap();
//! let data: serde_yaml::Value = serde_yaml::from_str("{name: x, tag: v1}").unwrap();
//! assert!(validator.validate(&data).is_valid);
//! ```

pub mod engine;
pub mod reporter;
pub mod rules;

pub use engine::{TypeRegistry, ValidationConfig, ValidationResult, Validator};
pub use reporter::{ValidationIssue, ValidationReport};
pub use rules::{Checker, Range};

use thiserror::Error;

/// Errors raised while registering or compiling type definitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown type '{}'", uri.escape_debug())]
    UnknownType { uri: String },

    #[error("unknown prefix '{prefix}' in type name '{}'", name.escape_debug())]
    UnknownPrefix { prefix: String, name: String },

    #[error("couldn't understand type name '{}'", .0.escape_debug())]
    InvalidTypeName(String),

    #[error("type '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

impl Error {
    pub(crate) fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema(message.into())
    }

    /// Whether the error stems from a reference the registry cannot resolve
    #[must_use]
    pub fn is_unknown_reference(&self) -> bool {
        matches!(self, Self::UnknownType { .. } | Self::UnknownPrefix { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Human-readable kind of a data value, used in issue messages
#[must_use]
pub fn value_kind(value: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
