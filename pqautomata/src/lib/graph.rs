//! Directed edge-labeled multigraphs and their automaton view.

use std::{collections::HashSet, error::Error, fmt, hash::Hash};

use indexmap::IndexSet;
use vob::Vob;

use crate::{Nfa, NodeIdx};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The error produced when a query references a node id the graph doesn't
/// contain. Unknown ids in a start/final node set are always rejected up
/// front rather than silently ignored.
#[derive(Debug, Eq, PartialEq)]
pub struct InvalidNodeSetError {
    /// A `Debug` rendering of the offending node id.
    pub node: String,
}

impl Error for InvalidNodeSetError {}

impl fmt::Display for InvalidNodeSetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node {} is not part of the graph", self.node)
    }
}

/// A directed multigraph whose edges each carry one string label. Node
/// identifiers are opaque to the graph: they are interned on first sight,
/// and their insertion index is the dense [`NodeIdx`] everything downstream
/// works with.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Graph<N> {
    nodes: IndexSet<N>,
    edges: Vec<(NodeIdx, String, NodeIdx)>,
}

impl<N: Clone + Eq + Hash> Graph<N> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Graph {
            nodes: IndexSet::new(),
            edges: Vec::new(),
        }
    }

    /// Intern `n`, returning its index. Adding a node twice is a no-op.
    pub fn add_node(&mut self, n: N) -> NodeIdx {
        let (i, _) = self.nodes.insert_full(n);
        NodeIdx::from_usize(i)
    }

    /// Add the edge `from -label-> to`, interning both endpoints.
    pub fn add_edge(&mut self, from: N, label: &str, to: N) {
        let fidx = self.add_node(from);
        let tidx = self.add_node(to);
        self.edges.push((fidx, label.to_owned(), tidx));
    }

    /// How many nodes does this graph have?
    pub fn nodes_len(&self) -> usize {
        self.nodes.len()
    }

    /// Return the identifier of node `nidx`.
    ///
    /// # Panics
    ///
    /// If `nidx` doesn't exist.
    pub fn node(&self, nidx: NodeIdx) -> &N {
        self.nodes.get_index(usize::from(nidx)).unwrap()
    }

    /// Return the index of node `n` or `None` if it doesn't exist.
    pub fn node_idx(&self, n: &N) -> Option<NodeIdx> {
        self.nodes.get_index_of(n).map(NodeIdx::from_usize)
    }

    /// Return an iterator over all edges.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIdx, &str, NodeIdx)> {
        self.edges.iter().map(|(f, l, t)| (*f, l.as_str(), *t))
    }

    /// Resolve an optional node subset against this graph: `None` means
    /// every node. The result is a bit vector over node indices.
    pub fn resolve_node_set(
        &self,
        nodes: Option<&HashSet<N>>,
    ) -> Result<Vob, InvalidNodeSetError>
    where
        N: fmt::Debug,
    {
        match nodes {
            None => Ok(Vob::from_elem(true, self.nodes_len())),
            Some(ns) => {
                let mut v = Vob::from_elem(false, self.nodes_len());
                for n in ns {
                    match self.node_idx(n) {
                        Some(nidx) => {
                            v.set(usize::from(nidx), true);
                        }
                        None => {
                            return Err(InvalidNodeSetError {
                                node: format!("{:?}", n),
                            });
                        }
                    }
                }
                Ok(v)
            }
        }
    }

    /// View this graph as an NFA: states are nodes, transitions are edges,
    /// and the start/final states are the given node subsets (the whole node
    /// set when unspecified). State indices coincide with node indices.
    pub fn to_nfa(
        &self,
        start_nodes: Option<&HashSet<N>>,
        final_nodes: Option<&HashSet<N>>,
    ) -> Result<Nfa, InvalidNodeSetError>
    where
        N: fmt::Debug,
    {
        let starts = self.resolve_node_set(start_nodes)?;
        let finals = self.resolve_node_set(final_nodes)?;
        let mut nfa = Nfa::new();
        for i in 0..self.nodes_len() {
            let st = nfa.add_state();
            if starts[i] {
                nfa.set_start(st);
            }
            if finals[i] {
                nfa.set_final(st);
            }
        }
        for (from, label, to) in self.edges() {
            nfa.add_edge(
                crate::StIdx(u32::from(from)),
                label,
                crate::StIdx(u32::from(to)),
            );
        }
        Ok(nfa)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn diamond() -> Graph<u32> {
        let mut g = Graph::new();
        g.add_edge(0, "a", 1);
        g.add_edge(0, "b", 2);
        g.add_edge(1, "c", 3);
        g.add_edge(2, "c", 3);
        g
    }

    #[test]
    fn test_interning() {
        let g = diamond();
        assert_eq!(g.nodes_len(), 4);
        assert_eq!(g.node_idx(&0), Some(NodeIdx(0)));
        assert_eq!(*g.node(NodeIdx(3)), 3);
        assert_eq!(g.node_idx(&9), None);
    }

    #[test]
    fn test_resolve_node_set_defaults_to_all() {
        let g = diamond();
        let all = g.resolve_node_set(None).unwrap();
        assert_eq!(all.iter_set_bits(..).count(), 4);
    }

    #[test]
    fn test_resolve_node_set_rejects_unknown() {
        let g = diamond();
        let ns = [7].into_iter().collect();
        assert_eq!(
            g.resolve_node_set(Some(&ns)),
            Err(InvalidNodeSetError {
                node: "7".to_owned()
            })
        );
    }

    #[test]
    fn test_to_nfa() {
        let g = diamond();
        let starts = [0].into_iter().collect();
        let finals = [3].into_iter().collect();
        let nfa = g.to_nfa(Some(&starts), Some(&finals)).unwrap();
        assert_eq!(nfa.states_len(), 4);
        assert!(nfa.is_start(crate::StIdx(0)));
        assert!(!nfa.is_start(crate::StIdx(1)));
        assert!(nfa.is_final(crate::StIdx(3)));
        assert_eq!(nfa.edges().count(), 4);
    }
}
