//! # rx-schema
//!
//! Multi-file Rx schema loading, namespace registry, and dependency ordering.
//!
//! A schema is a YAML document stream spread over one or more files. Each file
//! declares a namespace tag (the first document's `schema` value) and a set of
//! named type definitions; documents carrying a `file` key pull in another
//! schema file. This crate turns such a tree of files into:
//!
//! ```text
//! SchemaLoader ──► MergedSchema ──► DependencyGraph ──► registration order
//!      │
//!      └──► NamespaceRegistry (tag → URI prefix)
//! ```

pub mod graph;
pub mod loader;
pub mod model;
pub mod order;
pub mod registry;

pub use graph::DependencyGraph;
pub use loader::{LoadWarning, SchemaLoader};
pub use model::{Declaration, MergedSchema, SchemaDocument, SchemaTree, TypeDefinition};
pub use order::topological_order;
pub use registry::{NamespaceRegistry, PrefixRegistration};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while assembling a schema
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid schema format in {}: {message}", path.display())]
    InvalidFormat { path: PathBuf, message: String },

    #[error("Document {index} of {} has no 'schema' field", path.display())]
    MissingSchemaField { path: PathBuf, index: usize },

    #[error("Invalid type name '{}' in {}", name.escape_debug(), path.display())]
    InvalidName { path: PathBuf, name: String },

    #[error("Type '{name}' is declared in both {} and {} with different definitions", first.display(), second.display())]
    DuplicateType {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Include cycle: {}", chain.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" -> "))]
    IncludeCycle { chain: Vec<PathBuf> },

    #[error("Dependency cycle detected at '{node}': {}", path.join(" -> "))]
    Cycle { node: String, path: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an invalid-format error for the given file.
    pub fn invalid_format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the load phase (as opposed to ordering).
    pub fn is_load_error(&self) -> bool {
        !matches!(self, Self::Cycle { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_lists_the_whole_path() {
        let error = Error::Cycle {
            node: "/app/A".to_string(),
            path: vec!["/app/A".into(), "/app/B".into(), "/app/A".into()],
        };
        assert_eq!(
            error.to_string(),
            "Dependency cycle detected at '/app/A': /app/A -> /app/B -> /app/A"
        );
        assert!(!error.is_load_error());
    }

    #[test]
    fn load_errors_render_on_one_line() {
        let error = Error::invalid_format("schemas/app.yaml", "expected a mapping");
        assert!(error.is_load_error());
        assert!(!error.to_string().contains('\n'));
        assert!(error.to_string().contains("schemas/app.yaml"));
    }
}
