//! Registration order over a dependency graph

use crate::graph::DependencyGraph;
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Order every node so that it comes after all of its dependencies.
///
/// Depth-first with three states (unvisited, in progress, done). Nodes are
/// visited in lexical order, so the result is deterministic; only the
/// dependency-relative order is meaningful.
pub fn topological_order(graph: &DependencyGraph) -> Result<Vec<String>> {
    let mut sorter = Sorter {
        graph,
        marks: HashMap::with_capacity(graph.node_count()),
        stack: Vec::new(),
        order: Vec::with_capacity(graph.node_count()),
    };

    for node in graph.nodes() {
        if !sorter.marks.contains_key(node) {
            sorter.visit(node)?;
        }
    }

    debug!("Registration order: {:?}", sorter.order);
    Ok(sorter.order)
}

struct Sorter<'g> {
    graph: &'g DependencyGraph,
    marks: HashMap<&'g str, Mark>,
    stack: Vec<&'g str>,
    order: Vec<String>,
}

impl<'g> Sorter<'g> {
    fn visit(&mut self, node: &'g str) -> Result<()> {
        self.marks.insert(node, Mark::InProgress);
        self.stack.push(node);

        let graph = self.graph;
        for dependency in graph.dependencies(node) {
            match self.marks.get(dependency) {
                Some(Mark::InProgress) => {
                    let start = self
                        .stack
                        .iter()
                        .position(|n| *n == dependency)
                        .unwrap_or(0);
                    let mut path: Vec<String> =
                        self.stack[start..].iter().map(ToString::to_string).collect();
                    path.push(dependency.to_string());
                    return Err(Error::Cycle {
                        node: dependency.to_string(),
                        path,
                    });
                }
                Some(Mark::Done) => continue,
                None => self.visit(dependency)?,
            }
        }

        self.stack.pop();
        self.marks.insert(node, Mark::Done);
        trace!("Ordered {}", node);
        self.order.push(node.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)], isolated: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (from, to) in edges {
            graph.add_edge(*from, *to);
        }
        for node in isolated {
            graph.add_node(*node);
        }
        graph
    }

    fn position(order: &[String], node: &str) -> usize {
        order.iter().position(|n| n == node).unwrap()
    }

    fn assert_respects_edges(graph: &DependencyGraph, order: &[String]) {
        assert_eq!(order.len(), graph.node_count());
        for node in graph.nodes() {
            for dependency in graph.dependencies(node) {
                assert!(
                    position(order, dependency) < position(order, node),
                    "{dependency} must come before {node} in {order:?}"
                );
            }
        }
    }

    #[test]
    fn test_dependency_comes_first() {
        let graph = graph(&[("Root", "Tag")], &[]);
        let order = topological_order(&graph).unwrap();
        assert_eq!(order, vec!["Tag", "Root"]);
    }

    #[test]
    fn test_diamond() {
        let graph = graph(&[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")], &[]);
        let order = topological_order(&graph).unwrap();
        assert_respects_edges(&graph, &order);
        assert_eq!(order.first().map(String::as_str), Some("D"));
        assert_eq!(order.last().map(String::as_str), Some("A"));
    }

    #[test]
    fn test_isolated_nodes_included_once() {
        let graph = graph(&[("B", "A")], &["Z", "M"]);
        let order = topological_order(&graph).unwrap();
        assert_eq!(order.len(), 4);
        assert_respects_edges(&graph, &order);

        let mut sorted = order.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn test_deterministic_order() {
        let graph = graph(&[("C", "A")], &["B", "D"]);
        assert_eq!(
            topological_order(&graph).unwrap(),
            vec!["A", "B", "C", "D"]
        );
    }

    #[test]
    fn test_long_chain() {
        let names: Vec<String> = (0..200).map(|i| format!("T{i:03}")).collect();
        let mut graph = DependencyGraph::new();
        for pair in names.windows(2) {
            graph.add_edge(pair[0].clone(), pair[1].clone());
        }
        let order = topological_order(&graph).unwrap();
        assert_respects_edges(&graph, &order);
        assert_eq!(order[0], "T199");
    }

    #[test]
    fn test_empty_graph() {
        assert!(topological_order(&DependencyGraph::new()).unwrap().is_empty());
    }

    #[test]
    fn test_cycle_detected() {
        let graph = graph(&[("A", "B"), ("B", "C"), ("C", "A")], &["D"]);
        match topological_order(&graph).unwrap_err() {
            Error::Cycle { node, path } => {
                assert_eq!(node, "A");
                assert_eq!(path, vec!["A", "B", "C", "A"]);
            }
            e => panic!("Expected Cycle error, got {:?}", e),
        }
    }

    #[test]
    fn test_two_node_cycle_behind_acyclic_prefix() {
        let graph = graph(&[("A", "B"), ("B", "C"), ("C", "B")], &[]);
        match topological_order(&graph).unwrap_err() {
            Error::Cycle { node, path } => {
                assert_eq!(node, "B");
                assert_eq!(path, vec!["B", "C", "B"]);
            }
            e => panic!("Expected Cycle error, got {:?}", e),
        }
    }
}
