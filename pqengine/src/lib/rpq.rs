//! Regular path querying by automaton intersection.

use std::{collections::HashSet, fmt, hash::Hash};

use pqautomata::{Graph, MatrixAutomaton, Nfa, NodeIdx, StIdx};

use crate::QueryError;

/// Find every pair of graph nodes connected by a path whose label word the
/// `pattern` automaton accepts. The graph is viewed as an NFA (nodes are
/// states, the start/final states being the given node subsets, the whole
/// node set when unspecified), intersected with the pattern, and the
/// transitive closure of the product projects accepting pairs back onto
/// nodes.
pub fn rpq<N: Clone + Eq + Hash + fmt::Debug>(
    pattern: &Nfa,
    graph: &Graph<N>,
    start_nodes: Option<&HashSet<N>>,
    final_nodes: Option<&HashSet<N>>,
) -> Result<HashSet<(N, N)>, QueryError> {
    let gm = MatrixAutomaton::from_nfa(&graph.to_nfa(start_nodes, final_nodes)?);
    let pm = MatrixAutomaton::from_nfa(pattern);

    // The graph goes on the left, so a product index is
    // `graph_state * pattern_states + pattern_state` and integer division
    // recovers the graph node.
    let product = gm.intersect(&pm);
    let tc = product.transitive_closure();

    let mut result = HashSet::new();
    for (i, j) in tc.iter_set() {
        if product.is_start(StIdx::from_usize(i)) && product.is_final(StIdx::from_usize(j)) {
            let from = NodeIdx::from_usize(i / pm.states_len());
            let to = NodeIdx::from_usize(j / pm.states_len());
            result.insert((graph.node(from).clone(), graph.node(to).clone()));
        }
    }
    Ok(result)
}
