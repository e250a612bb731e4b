#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # rx-pipeline
//!
//! Schema assembly, ordered type registration, and data validation.
//!
//! A run loads a schema tree, orders its types so every dependency is
//! registered before its dependents, compiles the root type, and either
//! validates a data document or summarises the assembled schema.

pub mod pipeline;
pub mod report;

pub use pipeline::{Pipeline, PipelineConfig};
pub use report::{Outcome, Report, SchemaSummary};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] rx_schema::Error),

    #[error("failed to register type '{name}': {source}")]
    TypeRegistration {
        name: String,
        #[source]
        source: rx_validation::Error,
    },

    #[error("failed to compile root type '{root}': {source}")]
    Compile {
        root: String,
        #[source]
        source: rx_validation::Error,
    },

    #[error(transparent)]
    Validation(#[from] rx_validation::ValidationReport),

    #[error("failed to load data file '{}': {message}", path.display())]
    DataLoad { path: PathBuf, message: String },

    #[error("invalid configuration '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    /// Create a data loading error with path context.
    pub fn data_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error with path context.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the schema itself is at fault, as opposed to the data or config
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::Schema(_) | Self::TypeRegistration { .. } | Self::Compile { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rx_validation::{ValidationIssue, ValidationReport};

    #[test]
    fn registration_error_names_the_type() {
        let error = Error::TypeRegistration {
            name: "/app".to_string(),
            source: rx_validation::Error::UnknownType {
                uri: "tag:local:app/Tag".to_string(),
            },
        };
        assert_eq!(
            error.to_string(),
            "failed to register type '/app': unknown type 'tag:local:app/Tag'"
        );
        assert!(error.is_schema_error());
    }

    #[test]
    fn cycle_error_is_passed_through() {
        let error = Error::from(rx_schema::Error::Cycle {
            node: "/app/A".to_string(),
            path: vec!["/app/A".to_string(), "/app/B".to_string(), "/app/A".to_string()],
        });
        assert_eq!(
            error.to_string(),
            "Dependency cycle detected at '/app/A': /app/A -> /app/B -> /app/A"
        );
    }

    #[test]
    fn validation_error_is_not_a_schema_error() {
        let report = ValidationReport::new(
            "/app",
            vec![ValidationIssue::new("$.tag", "expected //str, found integer")],
        );
        let error = Error::from(report);
        assert!(!error.is_schema_error());
        assert!(!error.to_string().contains('\n'));
    }

    #[test]
    fn data_load_error_preserves_path() {
        match Error::data_load("/tmp/data.yaml", "not found") {
            Error::DataLoad { path, message } => {
                assert_eq!(path, PathBuf::from("/tmp/data.yaml"));
                assert_eq!(message, "not found");
            }
            _ => panic!("expected data load variant"),
        }
    }
}
