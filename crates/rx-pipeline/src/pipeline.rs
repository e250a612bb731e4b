//! Pipeline orchestration
//!
//! Load, order, register, compile, validate. Registries are built fresh for
//! every run and handed down by reference.

use std::fs;
use std::path::Path;

use rx_schema::registry::DEFAULT_NAMESPACE_ROOT;
use rx_schema::{topological_order, DependencyGraph, MergedSchema, NamespaceRegistry, SchemaLoader};
use rx_validation::{TypeRegistry, ValidationConfig, ValidationReport, Validator};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, info};

use crate::{Error, Outcome, Report, Result, SchemaSummary};

/// Configuration for the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Namespace root local tags are qualified against
    pub namespace_root: String,
    /// Error collection settings for data validation
    pub validation: ValidationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            namespace_root: DEFAULT_NAMESPACE_ROOT.to_string(),
            validation: ValidationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid configuration.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::config(path, e.to_string()))?;
        Self::from_yaml(&content).map_err(|e| Error::config(path, e.to_string()))
    }

    /// Parse configuration from YAML text; an empty document yields the defaults
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or unknown fields.
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

/// Schema validation pipeline
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Assemble the schema at `schema_path` and validate `data_path` against its root type
    ///
    /// Without a data file the assembled schema is summarised instead.
    ///
    /// # Errors
    ///
    /// Fails on the first load, ordering, registration, or compile error, or
    /// when the data does not conform.
    pub fn run(&self, schema_path: &Path, data_path: Option<&Path>) -> Result<Report> {
        let mut namespaces = NamespaceRegistry::new(self.config.namespace_root.clone());

        info!("Loading schema: {}", schema_path.display());
        let mut loader = SchemaLoader::new(&mut namespaces);
        let schema = loader.load(schema_path)?;
        let warnings = loader.take_warnings();

        let graph = DependencyGraph::build(&schema);
        debug!(
            "Dependency graph: {} types, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        let order = topological_order(&graph)?;
        info!("Registration order: {}", order.join(", "));

        let mut types = TypeRegistry::new(&namespaces);
        register_all(&mut types, &schema, &order)?;
        let validator = compile_root(&types, &schema)?.with_config(self.config.validation.clone());

        let outcome = match data_path {
            Some(data_path) => {
                let data = load_data(data_path)?;
                info!("Validating {} against '{}'", data_path.display(), schema.root);

                let result = validator.validate(&data);
                if !result.is_valid {
                    return Err(Error::Validation(ValidationReport::new(
                        schema.root.clone(),
                        result.errors,
                    )));
                }
                Outcome::Validated {
                    root: schema.root,
                    data: data_path.to_path_buf(),
                }
            }
            None => Outcome::Schema(SchemaSummary {
                registered: types.uris().map(str::to_string).collect(),
                prefixes: namespaces.prefixes().clone(),
                root: schema.root,
                types: schema.types,
                order,
            }),
        };

        Ok(Report { warnings, outcome })
    }
}

/// Register every type in `order`, stopping at the first failure
fn register_all(types: &mut TypeRegistry<'_>, schema: &MergedSchema, order: &[String]) -> Result<()> {
    for name in order {
        let Some(definition) = schema.get(name) else {
            continue;
        };
        types
            .register_type(name, definition)
            .map_err(|source| Error::TypeRegistration {
                name: name.clone(),
                source,
            })?;
    }
    Ok(())
}

fn compile_root(types: &TypeRegistry<'_>, schema: &MergedSchema) -> Result<Validator> {
    let compile_error = |source| Error::Compile {
        root: schema.root.clone(),
        source,
    };
    let definition = schema.root_definition().ok_or_else(|| {
        compile_error(rx_validation::Error::UnknownType {
            uri: schema.qualified(&schema.root),
        })
    })?;
    types.compile(definition).map_err(compile_error)
}

fn load_data(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| Error::data_load(path, e.to_string()))?;
    serde_yaml::from_str(&content).map_err(|e| Error::data_load(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.namespace_root, "tag:local:");
        assert!(config.validation.continue_on_error);
        assert_eq!(config.validation.max_errors, 0);
    }

    #[test]
    fn test_config_from_yaml() {
        let config = PipelineConfig::from_yaml(
            "namespace_root: \"tag:example.com,2024:\"\nvalidation:\n  continue_on_error: false\n",
        )
        .unwrap();
        assert_eq!(config.namespace_root, "tag:example.com,2024:");
        assert!(!config.validation.continue_on_error);
        assert_eq!(config.validation.max_errors, 0);

        assert_eq!(PipelineConfig::from_yaml("").unwrap(), PipelineConfig::default());
        assert!(PipelineConfig::from_yaml("strictness: high").is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/rx.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
