//! Results of a pipeline run

use std::collections::BTreeMap;
use std::path::PathBuf;

use rx_schema::{LoadWarning, TypeDefinition};
use serde::Serialize;

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct Report {
    /// Non-fatal problems met while loading the schema
    pub warnings: Vec<LoadWarning>,
    pub outcome: Outcome,
}

impl Report {
    /// Whether a data document was checked
    #[must_use]
    pub fn validated(&self) -> bool {
        matches!(self.outcome, Outcome::Validated { .. })
    }

    /// The schema summary, when no data was given
    #[must_use]
    pub fn summary(&self) -> Option<&SchemaSummary> {
        match &self.outcome {
            Outcome::Schema(summary) => Some(summary),
            Outcome::Validated { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    /// The data document conforms to the root type
    Validated { root: String, data: PathBuf },
    /// No data was given; the assembled schema
    Schema(SchemaSummary),
}

/// The assembled schema and the registries built from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaSummary {
    /// Name of the root type
    pub root: String,
    /// Every declared type, by name
    pub types: BTreeMap<String, TypeDefinition>,
    /// Names in the order they were registered
    pub order: Vec<String>,
    /// Prefix to URI mappings, built-in ones included
    pub prefixes: BTreeMap<String, String>,
    /// URIs of the registered types
    pub registered: Vec<String>,
}
