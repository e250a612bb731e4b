//! Schema loader with recursive file inclusion

use crate::model::{base_dir, Declaration, MergedSchema, SchemaDocument, SchemaTree};
use crate::registry::{NamespaceRegistry, PrefixRegistration};
use crate::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, trace, warn};

const SCHEMA_KEY: &str = "schema";
const FILE_KEY: &str = "file";

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[-._A-Za-z0-9]*$").expect("tag pattern is valid"));

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/[-._A-Za-z0-9]*(?:/[-._A-Za-z0-9]+)*$").expect("name pattern is valid")
});

/// Non-fatal conditions met while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// A file declared a tag whose prefix was already registered
    DuplicatePrefix {
        tag: String,
        path: PathBuf,
        existing: String,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::DuplicatePrefix { tag, existing, .. } => {
                write!(f, "tag '{tag}' already registered (keeping {existing})")
            }
        }
    }
}

/// Loads a schema file and everything it includes
pub struct SchemaLoader<'ns> {
    namespaces: &'ns mut NamespaceRegistry,
    documents: Vec<SchemaDocument>,
    loaded: HashMap<PathBuf, usize>,
    in_progress: Vec<PathBuf>,
    warnings: Vec<LoadWarning>,
}

impl<'ns> SchemaLoader<'ns> {
    /// Create a loader registering tags into the given registry
    pub fn new(namespaces: &'ns mut NamespaceRegistry) -> Self {
        Self {
            namespaces,
            documents: Vec::new(),
            loaded: HashMap::new(),
            in_progress: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Load a schema file and merge it with its includes
    pub fn load(&mut self, path: &Path) -> Result<MergedSchema> {
        self.load_tree(path)?.merge()
    }

    /// Load a schema file into a tree of documents without merging
    pub fn load_tree(&mut self, path: &Path) -> Result<SchemaTree> {
        self.reset();
        let root = self.load_file(path, None)?;
        Ok(self.finish(root))
    }

    /// Load a schema from a YAML string; includes resolve against `origin`'s directory
    pub fn load_from_yaml(&mut self, origin: &Path, yaml: &str) -> Result<MergedSchema> {
        self.reset();
        trace!("Loading schema from string with origin: {:?}", origin);

        self.in_progress.push(origin.to_path_buf());
        let result = self.parse_stream(origin, yaml, None);
        self.in_progress.pop();

        let root = result?;
        self.finish(root).merge()
    }

    /// Warnings collected so far
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Drain the collected warnings
    pub fn take_warnings(&mut self) -> Vec<LoadWarning> {
        std::mem::take(&mut self.warnings)
    }

    fn reset(&mut self) {
        self.documents.clear();
        self.loaded.clear();
        self.in_progress.clear();
    }

    fn finish(&mut self, root: usize) -> SchemaTree {
        self.loaded.clear();
        SchemaTree::new(
            std::mem::take(&mut self.documents),
            root,
            self.namespaces.root(),
        )
    }

    fn load_file(&mut self, path: &Path, parent: Option<usize>) -> Result<usize> {
        if !path.is_file() {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            });
        }

        let key = path.canonicalize()?;
        if let Some(&index) = self.loaded.get(&key) {
            debug!("Schema file already loaded: {:?}", path);
            return Ok(index);
        }

        if let Some(start) = self.in_progress.iter().position(|p| *p == key) {
            let mut chain = self.in_progress[start..].to_vec();
            chain.push(key);
            return Err(Error::IncludeCycle { chain });
        }

        info!("Loading schema file: {:?}", path);
        let content = std::fs::read_to_string(path)?;

        self.in_progress.push(key.clone());
        let result = self.parse_stream(path, &content, parent);
        self.in_progress.pop();

        let index = result?;
        self.loaded.insert(key, index);
        Ok(index)
    }

    fn parse_stream(&mut self, path: &Path, content: &str, parent: Option<usize>) -> Result<usize> {
        let raw = parse_documents(path, content)?;

        let mut bodies = Vec::with_capacity(raw.len());
        for (position, mut body) in raw.into_iter().enumerate() {
            let name = take_schema_field(path, position, &mut body)?;
            bodies.push((name, body));
        }

        let tag = bodies[0].0.clone();
        if !TAG_PATTERN.is_match(&tag) {
            return Err(Error::InvalidName {
                path: path.to_path_buf(),
                name: tag,
            });
        }
        self.register_tag(path, &tag);

        let index = self.documents.len();
        let mut document = SchemaDocument::new(path, tag);
        document.parent = parent;
        self.documents.push(document);

        for (name, mut body) in bodies {
            if !NAME_PATTERN.is_match(&name) {
                return Err(Error::InvalidName {
                    path: path.to_path_buf(),
                    name,
                });
            }

            let declaration = match body.remove(FILE_KEY) {
                Some(file) => {
                    let file = file.as_str().ok_or_else(|| {
                        Error::invalid_format(path, format!("'{FILE_KEY}' of '{name}' must be a string"))
                    })?;
                    if !body.is_empty() {
                        return Err(Error::invalid_format(
                            path,
                            format!("include '{name}' may only carry '{SCHEMA_KEY}' and '{FILE_KEY}'"),
                        ));
                    }
                    let included = base_dir(path).join(file);
                    trace!("{} includes {:?}", name, included);
                    let document = self.load_file(&included, Some(index))?;
                    Declaration::Include { name, document }
                }
                None => Declaration::Local {
                    name,
                    definition: Value::Mapping(body),
                },
            };

            debug!("Declared {} in {:?}", declaration.name(), path);
            self.documents[index].declarations.push(declaration);
        }

        Ok(index)
    }

    fn register_tag(&mut self, path: &Path, tag: &str) {
        if let PrefixRegistration::AlreadyRegistered { existing } = self.namespaces.register_tag(tag) {
            warn!("tag '{}' already registered", tag);
            self.warnings.push(LoadWarning::DuplicatePrefix {
                tag: tag.to_string(),
                path: path.to_path_buf(),
                existing,
            });
        }
    }
}

/// Split a YAML stream into its documents, each of which must be a mapping
fn parse_documents(path: &Path, content: &str) -> Result<Vec<Mapping>> {
    let mut documents = Vec::new();
    for (position, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value = Value::deserialize(document)
            .map_err(|e| Error::invalid_format(path, format!("YAML parse error: {e}")))?;
        match value {
            Value::Mapping(mapping) => documents.push(mapping),
            Value::Null => {
                return Err(Error::invalid_format(
                    path,
                    format!("document {position} is empty"),
                ));
            }
            _ => {
                return Err(Error::invalid_format(
                    path,
                    format!("document {position} is not a mapping"),
                ));
            }
        }
    }

    if documents.is_empty() {
        return Err(Error::invalid_format(path, "no documents in schema stream"));
    }
    Ok(documents)
}

fn take_schema_field(path: &Path, position: usize, body: &mut Mapping) -> Result<String> {
    match body.remove(SCHEMA_KEY) {
        Some(Value::String(name)) => Ok(name),
        Some(_) => Err(Error::invalid_format(
            path,
            format!("'{SCHEMA_KEY}' of document {position} must be a string"),
        )),
        None => Err(Error::MissingSchemaField {
            path: path.to_path_buf(),
            index: position,
        }),
    }
}
