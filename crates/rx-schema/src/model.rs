//! Schema model definitions

use crate::registry::qualify;
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Raw structural type definition, opaque to this crate
pub type TypeDefinition = serde_yaml::Value;

/// One named entry of a schema file
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// A type declared in place
    Local {
        name: String,
        definition: TypeDefinition,
    },
    /// A name bound to the root type of another schema file
    Include { name: String, document: usize },
}

impl Declaration {
    /// The declared (unqualified) name
    pub fn name(&self) -> &str {
        match self {
            Declaration::Local { name, .. } | Declaration::Include { name, .. } => name,
        }
    }
}

/// A parsed schema file
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    /// Where the file was read from
    pub path: PathBuf,
    /// Namespace tag, also the name of the file's root type
    pub tag: String,
    /// Declarations in file order
    pub declarations: Vec<Declaration>,
    /// Index of the file that first included this one
    pub parent: Option<usize>,
}

impl SchemaDocument {
    pub fn new(path: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            tag: tag.into(),
            declarations: Vec::new(),
            parent: None,
        }
    }

    /// Indexes of the files this one includes
    pub fn includes(&self) -> impl Iterator<Item = usize> + '_ {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Include { document, .. } => Some(*document),
            Declaration::Local { .. } => None,
        })
    }
}

/// Arena of schema files, the root tracked by index
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaTree {
    documents: Vec<SchemaDocument>,
    root: usize,
    namespace_root: String,
}

impl SchemaTree {
    pub fn new(documents: Vec<SchemaDocument>, root: usize, namespace_root: impl Into<String>) -> Self {
        Self {
            documents,
            root,
            namespace_root: namespace_root.into(),
        }
    }

    pub fn root(&self) -> &SchemaDocument {
        &self.documents[self.root]
    }

    pub fn get(&self, index: usize) -> Option<&SchemaDocument> {
        self.documents.get(index)
    }

    pub fn documents(&self) -> &[SchemaDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Flatten the tree into one map of type name to definition.
    ///
    /// Each file is merged once even when included from several places. A
    /// name bound to two different definitions is a [`Error::DuplicateType`].
    pub fn merge(&self) -> Result<MergedSchema> {
        let mut merger = Merger {
            tree: self,
            types: BTreeMap::new(),
            origins: HashMap::new(),
            merged: HashSet::new(),
        };
        merger.merge_document(self.root)?;

        debug!(
            "Merged {} schema file(s) into {} type(s)",
            self.documents.len(),
            merger.types.len()
        );

        Ok(MergedSchema {
            root: self.root().tag.clone(),
            namespace_root: self.namespace_root.clone(),
            types: merger.types,
        })
    }
}

struct Merger<'a> {
    tree: &'a SchemaTree,
    types: BTreeMap<String, TypeDefinition>,
    origins: HashMap<String, usize>,
    merged: HashSet<usize>,
}

impl Merger<'_> {
    fn merge_document(&mut self, index: usize) -> Result<()> {
        if !self.merged.insert(index) {
            return Ok(());
        }

        let tree = self.tree;
        let document = &tree.documents[index];
        for declaration in &document.declarations {
            match declaration {
                Declaration::Local { name, definition } => {
                    self.insert(name, definition.clone(), index)?;
                }
                Declaration::Include {
                    name,
                    document: included,
                } => {
                    self.merge_document(*included)?;
                    let included_root = &tree.documents[*included].tag;
                    // The included root is always declared by its own first document
                    let definition = self.types.get(included_root).cloned().ok_or_else(|| {
                        Error::invalid_format(
                            &tree.documents[*included].path,
                            format!("root type '{included_root}' is not declared"),
                        )
                    })?;
                    trace!("Binding {} to included root {}", name, included_root);
                    self.insert(name, definition, index)?;
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, definition: TypeDefinition, origin: usize) -> Result<()> {
        if let Some(existing) = self.types.get(name) {
            if *existing == definition {
                return Ok(());
            }
            let first = self.origins.get(name).copied().unwrap_or(origin);
            return Err(Error::DuplicateType {
                name: name.to_string(),
                first: self.tree.documents[first].path.clone(),
                second: self.tree.documents[origin].path.clone(),
            });
        }
        self.types.insert(name.to_string(), definition);
        self.origins.insert(name.to_string(), origin);
        Ok(())
    }
}

/// All types of a schema tree in one namespace-qualified map
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSchema {
    /// Name of the root type (the root file's tag)
    pub root: String,
    /// Namespace root declared names are qualified against
    pub namespace_root: String,
    /// Declared name to raw definition, ordered by name
    pub types: BTreeMap<String, TypeDefinition>,
}

impl MergedSchema {
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Fully qualified URI of a declared name
    pub fn qualified(&self, name: &str) -> String {
        qualify(&self.namespace_root, name)
    }

    /// Definition of the root type
    pub fn root_definition(&self) -> Option<&TypeDefinition> {
        self.types.get(&self.root)
    }
}

/// Directory includes of a file are resolved against
pub(crate) fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}
