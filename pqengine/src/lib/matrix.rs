//! Context-free path querying by boolean matrix multiplication.
//!
//! Each rule of the weak-normal-form grammar gets one n×n boolean matrix
//! (`n` being the node count); entry (`u`, `v`) of rule `A`'s matrix says
//! that `u` reaches `v` along a word derivable from `A`. Binary productions
//! become matrix products, applied semi-naively in passes until the total
//! number of set entries stops growing. The relation computed is exactly the
//! Hellings one — the matrix form just trades the triple-at-a-time worklist
//! for bulk row operations.

use std::{collections::HashSet, fmt, hash::Hash};

use pqautomata::{BitMatrix, Graph};
use pqgrammar::{Cfg, WeakNf};

use crate::QueryError;

/// Find every pair of graph nodes connected by a path derivable from `cfg`'s
/// start rule.
pub fn cfpq_matrix<N: Clone + Eq + Hash + fmt::Debug>(
    cfg: &Cfg,
    graph: &Graph<N>,
    start_nodes: Option<&HashSet<N>>,
    final_nodes: Option<&HashSet<N>>,
) -> Result<HashSet<(N, N)>, QueryError> {
    let starts = graph.resolve_node_set(start_nodes)?;
    let finals = graph.resolve_node_set(final_nodes)?;
    let wnf = WeakNf::new(cfg);

    let nodes_len = graph.nodes_len();
    let mut mats = (0..usize::from(wnf.rules_len()))
        .map(|_| BitMatrix::new(nodes_len))
        .collect::<Vec<_>>();

    for &a in wnf.epsilon_prods() {
        mats[usize::from(a)].set_diagonal();
    }
    for (from, label, to) in graph.edges() {
        if let Some(tidx) = wnf.token_idx(label) {
            for &a in wnf.term_prods_for(tidx) {
                mats[usize::from(a)].set(usize::from(from), usize::from(to), true);
            }
        }
    }

    let mut last = mats.iter().map(|m| m.count_ones()).sum::<usize>();
    let mut passes = 0;
    loop {
        passes += 1;
        for &(a, b, c) in wnf.binary_prods() {
            let prod = mats[usize::from(b)].mul(&mats[usize::from(c)]);
            mats[usize::from(a)].or(&prod);
        }
        let cur = mats.iter().map(|m| m.count_ones()).sum::<usize>();
        if cur == last {
            break;
        }
        last = cur;
    }
    log::debug!(
        "matrix CFPQ stabilised after {} passes at {} entries",
        passes,
        last
    );

    let mut result = HashSet::new();
    for (i, j) in mats[usize::from(wnf.start_rule())].iter_set() {
        if starts[i] && finals[j] {
            result.insert((
                graph.node(pqautomata::NodeIdx::from_usize(i)).clone(),
                graph.node(pqautomata::NodeIdx::from_usize(j)).clone(),
            ));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use pqgrammar::CfgBuilder;

    #[test]
    fn test_nested_brackets() {
        // a^n b^n over a bracket ladder.
        let mut b = CfgBuilder::new("S");
        b.tokens(&["a", "b"]);
        b.prod("S", &["a", "S", "b"]);
        b.prod("S", &["a", "b"]);
        let mut g = Graph::new();
        g.add_edge(0u32, "a", 1);
        g.add_edge(1, "a", 2);
        g.add_edge(2, "b", 3);
        g.add_edge(3, "b", 4);
        let got = cfpq_matrix(&b.build(), &g, None, None).unwrap();
        assert_eq!(got, [(1, 3), (0, 4)].into_iter().collect());
    }

    #[test]
    fn test_multiple_terminal_rules_per_label() {
        // Both A and B match an `a` edge; S needs one of each.
        let mut b = CfgBuilder::new("S");
        b.token("a");
        b.prod("S", &["A", "B"]);
        b.prod("A", &["a"]);
        b.prod("B", &["a"]);
        let mut g = Graph::new();
        g.add_edge(0u32, "a", 1);
        g.add_edge(1, "a", 2);
        let got = cfpq_matrix(&b.build(), &g, None, None).unwrap();
        assert_eq!(got, [(0, 2)].into_iter().collect());
    }
}
