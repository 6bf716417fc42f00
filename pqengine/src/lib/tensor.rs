//! Context-free path querying by Kronecker products with the grammar's
//! recursive state machine.
//!
//! The RSM's matrix view is intersected with the graph's; wherever the
//! transitive closure of the product walks one box from its start state to a
//! final state, the graph is known to contain a complete derivation of that
//! box's rule between the two graph nodes involved, and a *summary edge*
//! labeled with the rule's name is written straight into the graph
//! automaton. Summary edges then participate in the next intersection as
//! ordinary transitions (matching the RSM's call edges), so derivations can
//! nest. The loop stops when the graph automaton's total entry count stops
//! growing — the nonzero count over a finite matrix family can only grow,
//! so it must.

use std::{collections::HashSet, fmt, hash::Hash};

use pqautomata::{Graph, MatrixAutomaton, NodeIdx, StIdx};
use pqgrammar::Rsm;

use crate::QueryError;

/// Find every pair of graph nodes connected by a path derivable from `rsm`'s
/// initial rule.
pub fn cfpq_tensor<N: Clone + Eq + Hash + fmt::Debug>(
    rsm: &Rsm,
    graph: &Graph<N>,
    start_nodes: Option<&HashSet<N>>,
    final_nodes: Option<&HashSet<N>>,
) -> Result<HashSet<(N, N)>, QueryError> {
    let mut gm = MatrixAutomaton::from_nfa(&graph.to_nfa(start_nodes, final_nodes)?);
    let (mut rm, info) = MatrixAutomaton::from_rsm(rsm)?;

    // Every boxed rule gets a summary channel on both sides, even if nothing
    // calls it yet: the graph side is written below and read at the end, the
    // RSM side keeps the alphabets aligned.
    for ridx in rsm.iter_ridxs() {
        if rsm.box_for(ridx).is_some() {
            rm.insert_empty_matrix(rsm.rule_name(ridx));
            gm.insert_empty_matrix(rsm.rule_name(ridx));
        }
    }

    let graph_states = gm.states_len();
    let mut last = usize::MAX;
    let mut rounds = 0;
    loop {
        rounds += 1;
        // The RSM goes on the left: a product index is
        // `rsm_state * graph_states + graph_state`.
        let product = rm.intersect(&gm);
        let tc = product.transitive_closure();
        for (row, col) in tc.iter_set() {
            let row_info = &info[row / graph_states];
            let col_info = &info[col / graph_states];
            if row_info.ridx == col_info.ridx && row_info.box_start && col_info.box_final {
                gm.set(
                    rsm.rule_name(row_info.ridx),
                    StIdx::from_usize(row % graph_states),
                    StIdx::from_usize(col % graph_states),
                );
            }
        }
        let cur = gm.count_ones();
        if cur == last {
            break;
        }
        last = cur;
    }
    log::debug!("tensor CFPQ stabilised after {} rounds", rounds);

    let mut result = HashSet::new();
    let init = gm
        .matrix(rsm.rule_name(rsm.start_rule()))
        .expect("summary channel was inserted above");
    for (i, j) in init.iter_set() {
        if gm.is_start(StIdx::from_usize(i)) && gm.is_final(StIdx::from_usize(j)) {
            result.insert((
                graph.node(NodeIdx::from_usize(i)).clone(),
                graph.node(NodeIdx::from_usize(j)).clone(),
            ));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use pqgrammar::{CfgBuilder, RsmError};

    #[test]
    fn test_nested_brackets() {
        let mut b = CfgBuilder::new("S");
        b.tokens(&["a", "b"]);
        b.prod("S", &["a", "S", "b"]);
        b.prod("S", &["a", "b"]);
        let rsm = Rsm::from_cfg(&b.build());
        let mut g = Graph::new();
        g.add_edge(0u32, "a", 1);
        g.add_edge(1, "a", 2);
        g.add_edge(2, "b", 3);
        g.add_edge(3, "b", 4);
        let got = cfpq_tensor(&rsm, &g, None, None).unwrap();
        assert_eq!(got, [(1, 3), (0, 4)].into_iter().collect());
    }

    #[test]
    fn test_dangling_call_rejected() {
        use pqgrammar::{RsmBox, Symbol};
        let mut rsm = Rsm::new("S");
        let missing = rsm.rule("T");
        let mut bx = RsmBox::new();
        let st = bx.add_state();
        bx.add_edge(RsmBox::start_state(), Symbol::Rule(missing), st);
        bx.set_final(st);
        rsm.add_box(rsm.start_rule(), bx);

        let mut g = Graph::new();
        g.add_edge(0u32, "a", 1);
        let got = cfpq_tensor(&rsm, &g, None, None);
        assert_eq!(
            got,
            Err(crate::QueryError::UnresolvedNonterminal(
                RsmError::UnresolvedNonterminal {
                    rule: "T".to_owned()
                }
            ))
        );
    }
}
