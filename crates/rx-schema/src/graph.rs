//! Dependency graph between declared types
//!
//! An edge `A -> B` means the definition of `A` references `B`. References are
//! found structurally: every string scalar in value position of a definition
//! tree is compared against the declared names (short `/tag/Name` form) and
//! their qualified URIs. Mapping keys are field names and never count.

use crate::model::{MergedSchema, TypeDefinition};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace};

/// Directed "depends-on" graph over type names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every type of a merged schema
    pub fn build(schema: &MergedSchema) -> Self {
        let mut lookup: HashMap<String, &str> = HashMap::new();
        for name in schema.names() {
            lookup.insert(name.to_string(), name);
            lookup.insert(schema.qualified(name), name);
        }

        let mut graph = Self::new();
        for (name, definition) in &schema.types {
            graph.add_node(name.clone());

            let mut referenced = BTreeSet::new();
            collect_references(definition, &lookup, &mut referenced);
            referenced.remove(name.as_str());

            for dependency in referenced {
                trace!("{} depends on {}", name, dependency);
                graph.add_edge(name.clone(), dependency);
            }
        }

        debug!(
            "Built dependency graph: {} node(s), {} edge(s)",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    pub fn add_node(&mut self, node: impl Into<String>) {
        self.edges.entry(node.into()).or_default();
    }

    /// Record that `from` depends on `to`; both become nodes
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let to = to.into();
        self.add_node(to.clone());
        self.edges.entry(from.into()).or_default().insert(to);
    }

    pub fn contains(&self, node: &str) -> bool {
        self.edges.contains_key(node)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.get(from).is_some_and(|deps| deps.contains(to))
    }

    /// All nodes in lexical order
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Direct dependencies of a node, in lexical order
    pub fn dependencies(&self, node: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(node)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// Nodes that depend directly on `node`
    pub fn dependents<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a str> {
        self.edges
            .iter()
            .filter(move |(_, deps)| deps.contains(node))
            .map(|(name, _)| name.as_str())
    }

    /// Nodes without dependencies
    pub fn leaves(&self) -> impl Iterator<Item = &str> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| name.as_str())
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

fn collect_references<'a>(
    definition: &TypeDefinition,
    lookup: &HashMap<String, &'a str>,
    found: &mut BTreeSet<&'a str>,
) {
    match definition {
        Value::String(text) => {
            if let Some(name) = lookup.get(text) {
                found.insert(*name);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_references(item, lookup, found);
            }
        }
        Value::Mapping(mapping) => {
            for value in mapping.values() {
                collect_references(value, lookup, found);
            }
        }
        Value::Tagged(tagged) => collect_references(&tagged.value, lookup, found),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
