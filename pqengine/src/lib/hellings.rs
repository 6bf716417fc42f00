//! Context-free path querying with the Hellings worklist.
//!
//! The state of the fixpoint is a set of triples `(n, A, m)`: graph node `n`
//! reaches graph node `m` along a word derivable from rule `A`. New triples
//! are joined against existing ones through the grammar's binary productions
//! until nothing new appears. Every triple enters the worklist exactly once,
//! and the triple space is finite, so the loop always drains.

use std::{collections::HashSet, fmt, hash::Hash};

use fnv::{FnvHashMap, FnvHashSet};

use pqautomata::{Graph, NodeIdx};
use pqgrammar::{Cfg, RIdx, WeakNf};

use crate::QueryError;

type Triple = (NodeIdx, RIdx, NodeIdx);

struct TripleSet {
    triples: FnvHashSet<Triple>,
    /// Triples `(n, A, m)` as `(A, n)` entries indexed by `m`.
    ending_at: Vec<Vec<(RIdx, NodeIdx)>>,
    /// Triples `(n, A, m)` as `(A, m)` entries indexed by `n`.
    starting_at: Vec<Vec<(RIdx, NodeIdx)>>,
    todo: Vec<Triple>,
}

impl TripleSet {
    fn new(nodes_len: usize) -> Self {
        TripleSet {
            triples: FnvHashSet::default(),
            ending_at: vec![Vec::new(); nodes_len],
            starting_at: vec![Vec::new(); nodes_len],
            todo: Vec::new(),
        }
    }

    fn add(&mut self, triple: Triple) {
        if self.triples.insert(triple) {
            let (n, ridx, m) = triple;
            self.ending_at[usize::from(m)].push((ridx, n));
            self.starting_at[usize::from(n)].push((ridx, m));
            self.todo.push(triple);
        }
    }
}

/// Find every pair of graph nodes connected by a path derivable from `cfg`'s
/// start rule. The grammar is taken to weak normal form first.
pub fn cfpq_hellings<N: Clone + Eq + Hash + fmt::Debug>(
    cfg: &Cfg,
    graph: &Graph<N>,
    start_nodes: Option<&HashSet<N>>,
    final_nodes: Option<&HashSet<N>>,
) -> Result<HashSet<(N, N)>, QueryError> {
    let starts = graph.resolve_node_set(start_nodes)?;
    let finals = graph.resolve_node_set(final_nodes)?;
    let wnf = WeakNf::new(cfg);

    // Binary productions `A: B C;` indexed by each body symbol.
    let mut by_snd: FnvHashMap<RIdx, Vec<(RIdx, RIdx)>> = FnvHashMap::default();
    let mut by_fst: FnvHashMap<RIdx, Vec<(RIdx, RIdx)>> = FnvHashMap::default();
    for &(a, b, c) in wnf.binary_prods() {
        by_snd.entry(c).or_default().push((a, b));
        by_fst.entry(b).or_default().push((a, c));
    }

    let mut set = TripleSet::new(graph.nodes_len());
    for &a in wnf.epsilon_prods() {
        for v in 0..graph.nodes_len() {
            set.add((NodeIdx::from_usize(v), a, NodeIdx::from_usize(v)));
        }
    }
    for (from, label, to) in graph.edges() {
        if let Some(tidx) = wnf.token_idx(label) {
            for &a in wnf.term_prods_for(tidx) {
                set.add((from, a, to));
            }
        }
    }

    while let Some((n, ridx, m)) = set.todo.pop() {
        let mut new = Vec::new();
        // `A: M ridx;` joined with an existing `(n2, M, n)` gives
        // `(n2, A, m)`.
        if let Some(prods) = by_snd.get(&ridx) {
            for &(mrule, n2) in &set.ending_at[usize::from(n)] {
                for &(a, fst) in prods {
                    if fst == mrule {
                        new.push((n2, a, m));
                    }
                }
            }
        }
        // `A: ridx M;` joined with an existing `(m, M, m2)` gives
        // `(n, A, m2)`.
        if let Some(prods) = by_fst.get(&ridx) {
            for &(mrule, m2) in &set.starting_at[usize::from(m)] {
                for &(a, snd) in prods {
                    if snd == mrule {
                        new.push((n, a, m2));
                    }
                }
            }
        }
        for triple in new {
            set.add(triple);
        }
    }

    log::debug!("hellings CFPQ derived {} triples", set.triples.len());

    let mut result = HashSet::new();
    for &(n, ridx, m) in &set.triples {
        if ridx == wnf.start_rule() && starts[usize::from(n)] && finals[usize::from(m)] {
            result.insert((graph.node(n).clone(), graph.node(m).clone()));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use pqgrammar::CfgBuilder;

    #[test]
    fn test_epsilon_only_grammar() {
        let mut b = CfgBuilder::new("S");
        b.prod("S", &[]);
        let mut g = Graph::new();
        g.add_edge(0u32, "a", 1);
        let got = cfpq_hellings(&b.build(), &g, None, None).unwrap();
        assert_eq!(got, [(0, 0), (1, 1)].into_iter().collect());
    }

    #[test]
    fn test_empty_grammar_language() {
        // S only derives itself, so nothing is reachable.
        let mut b = CfgBuilder::new("S");
        b.token("a");
        b.prod("S", &["S", "a"]);
        let mut g = Graph::new();
        g.add_edge(0u32, "a", 1);
        let got = cfpq_hellings(&b.build(), &g, None, None).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn test_start_rule_only_in_answer() {
        // `A: 'a';` relates 0 to 1, but the start rule S needs `a b`.
        let mut b = CfgBuilder::new("S");
        b.tokens(&["a", "b"]);
        b.prod("S", &["A", "B"]);
        b.prod("A", &["a"]);
        b.prod("B", &["b"]);
        let mut g = Graph::new();
        g.add_edge(0u32, "a", 1);
        g.add_edge(1, "b", 2);
        let got = cfpq_hellings(&b.build(), &g, None, None).unwrap();
        assert_eq!(got, [(0, 2)].into_iter().collect());
    }
}
