#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![forbid(unsafe_code)]

//! `pqengine` answers path queries over directed edge-labeled graphs: given
//! a pattern and a graph, find every pair of nodes connected by a path whose
//! label word belongs to the pattern's language.
//!
//! For regular patterns there is one engine, [`rpq`], built on automaton
//! intersection. For context-free patterns there are four, all computing the
//! same relation through different fixpoints:
//!
//!   * [`cfpq_hellings`] — a worklist over explicit reachability triples;
//!   * [`cfpq_matrix`] — boolean matrix multiplication per grammar rule;
//!   * [`cfpq_tensor`] — repeated Kronecker intersection of the graph with
//!     the grammar's recursive state machine;
//!   * [`cfpq_gll`] — a GLL-style parse of the graph driven by a
//!     graph-structured stack.
//!
//! [`cfpq`] dispatches between the four via [`CfpqAlgorithm`]. Each query
//! owns all of its intermediate state; nothing is shared or reused across
//! queries, so queries are freely parallel at the caller's discretion.
//!
//! Unspecified start/final node sets default to the graph's full node set.
//! A start/final set mentioning a node the graph doesn't contain is reported
//! as [`QueryError::InvalidNodeSet`]; an RSM whose call edges reference a
//! boxless rule is reported as [`QueryError::UnresolvedNonterminal`]. Graph
//! edge labels outside the pattern's alphabet are not errors — such edges
//! are simply never matched.

use std::{collections::HashSet, error::Error, fmt, hash::Hash};

use pqautomata::{Graph, InvalidNodeSetError};
use pqgrammar::{Cfg, Rsm, RsmError};

mod gll;
mod hellings;
mod matrix;
mod rpq;
mod tensor;

pub use crate::gll::cfpq_gll;
pub use crate::hellings::cfpq_hellings;
pub use crate::matrix::cfpq_matrix;
pub use crate::rpq::rpq;
pub use crate::tensor::cfpq_tensor;

/// The errors a query can produce.
#[derive(Debug, Eq, PartialEq)]
pub enum QueryError {
    /// A start/final node set references a node that is not in the graph.
    InvalidNodeSet(InvalidNodeSetError),
    /// The pattern's RSM has a call edge referencing a rule with no box.
    UnresolvedNonterminal(RsmError),
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            QueryError::InvalidNodeSet(e) => Some(e),
            QueryError::UnresolvedNonterminal(e) => Some(e),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryError::InvalidNodeSet(e) => e.fmt(f),
            QueryError::UnresolvedNonterminal(e) => e.fmt(f),
        }
    }
}

impl From<InvalidNodeSetError> for QueryError {
    fn from(e: InvalidNodeSetError) -> Self {
        QueryError::InvalidNodeSet(e)
    }
}

impl From<RsmError> for QueryError {
    fn from(e: RsmError) -> Self {
        QueryError::UnresolvedNonterminal(e)
    }
}

/// Which context-free path query strategy to run. All four compute the same
/// relation; they differ in how the fixpoint is represented and therefore in
/// performance characteristics, not in answers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CfpqAlgorithm {
    Hellings,
    Matrix,
    Tensor,
    Gll,
}

/// Run a context-free path query for `cfg` over `graph` with the chosen
/// `algorithm`. The tensor and GLL engines consume the grammar through
/// [`Rsm::from_cfg`].
pub fn cfpq<N: Clone + Eq + Hash + fmt::Debug>(
    algorithm: CfpqAlgorithm,
    cfg: &Cfg,
    graph: &Graph<N>,
    start_nodes: Option<&HashSet<N>>,
    final_nodes: Option<&HashSet<N>>,
) -> Result<HashSet<(N, N)>, QueryError> {
    match algorithm {
        CfpqAlgorithm::Hellings => cfpq_hellings(cfg, graph, start_nodes, final_nodes),
        CfpqAlgorithm::Matrix => cfpq_matrix(cfg, graph, start_nodes, final_nodes),
        CfpqAlgorithm::Tensor => {
            cfpq_tensor(&Rsm::from_cfg(cfg), graph, start_nodes, final_nodes)
        }
        CfpqAlgorithm::Gll => cfpq_gll(&Rsm::from_cfg(cfg), graph, start_nodes, final_nodes),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pqgrammar::CfgBuilder;
    use test_case::test_case;

    const ALGORITHMS: [CfpqAlgorithm; 4] = [
        CfpqAlgorithm::Hellings,
        CfpqAlgorithm::Matrix,
        CfpqAlgorithm::Tensor,
        CfpqAlgorithm::Gll,
    ];

    /// The graph from the reachability lecture: a two-node `b` cycle hanging
    /// off a three-node `a` cycle.
    fn lecture_graph() -> Graph<u32> {
        let mut g = Graph::new();
        g.add_edge(0, "b", 1);
        g.add_edge(1, "b", 0);
        g.add_edge(0, "a", 2);
        g.add_edge(2, "a", 3);
        g.add_edge(3, "a", 0);
        g
    }

    /// `S: 'a' S 'b' | 'a' 'b';`
    fn brackets_cfg() -> Cfg {
        let mut b = CfgBuilder::new("S");
        b.tokens(&["a", "b"]);
        b.prod("S", &["a", "S", "b"]);
        b.prod("S", &["a", "b"]);
        b.build()
    }

    fn pairs(ps: &[(u32, u32)]) -> HashSet<(u32, u32)> {
        ps.iter().copied().collect()
    }

    #[test_case(CfpqAlgorithm::Hellings; "hellings")]
    #[test_case(CfpqAlgorithm::Matrix; "matrix")]
    #[test_case(CfpqAlgorithm::Tensor; "tensor")]
    #[test_case(CfpqAlgorithm::Gll; "gll")]
    fn test_lecture_scenario(algorithm: CfpqAlgorithm) {
        let starts = [3].into_iter().collect();
        let finals = [0, 1, 2, 3].into_iter().collect();
        let got = cfpq(
            algorithm,
            &brackets_cfg(),
            &lecture_graph(),
            Some(&starts),
            Some(&finals),
        )
        .unwrap();
        assert_eq!(got, pairs(&[(3, 0), (3, 1)]));
    }

    #[test_case(CfpqAlgorithm::Hellings; "hellings")]
    #[test_case(CfpqAlgorithm::Matrix; "matrix")]
    #[test_case(CfpqAlgorithm::Tensor; "tensor")]
    #[test_case(CfpqAlgorithm::Gll; "gll")]
    fn test_one_way_scenario(algorithm: CfpqAlgorithm) {
        let mut g = Graph::new();
        g.add_edge(0u32, "a", 1);
        g.add_edge(1, "b", 2);
        let mut b = CfgBuilder::new("S");
        b.tokens(&["a", "b"]);
        b.prod("S", &["A", "S", "B", "S"]);
        b.prod("S", &[]);
        b.prod("A", &["a"]);
        b.prod("B", &["b"]);
        let starts = [0].into_iter().collect();
        let finals = [2].into_iter().collect();
        let got = cfpq(algorithm, &b.build(), &g, Some(&starts), Some(&finals)).unwrap();
        assert_eq!(got, pairs(&[(0, 2)]));
    }

    #[test_case(CfpqAlgorithm::Hellings; "hellings")]
    #[test_case(CfpqAlgorithm::Matrix; "matrix")]
    #[test_case(CfpqAlgorithm::Tensor; "tensor")]
    #[test_case(CfpqAlgorithm::Gll; "gll")]
    fn test_left_recursion_on_cycle(algorithm: CfpqAlgorithm) {
        // A left-recursive grammar for `a+` over a three-node `a` cycle:
        // every node reaches every node, itself included.
        let mut g = Graph::new();
        g.add_edge(0u32, "a", 1);
        g.add_edge(1, "a", 2);
        g.add_edge(2, "a", 0);
        let mut b = CfgBuilder::new("S");
        b.token("a");
        b.prod("S", &["S", "a"]);
        b.prod("S", &["a"]);
        let got = cfpq(algorithm, &b.build(), &g, None, None).unwrap();
        let mut expected = HashSet::new();
        for i in 0..3 {
            for j in 0..3 {
                expected.insert((i, j));
            }
        }
        assert_eq!(got, expected);
    }

    #[test_case(CfpqAlgorithm::Hellings; "hellings")]
    #[test_case(CfpqAlgorithm::Matrix; "matrix")]
    #[test_case(CfpqAlgorithm::Tensor; "tensor")]
    #[test_case(CfpqAlgorithm::Gll; "gll")]
    fn test_mutual_recursion_on_cycle(algorithm: CfpqAlgorithm) {
        // `S: T 'a' | 'a'; T: S;` also derives exactly `a+`, through a unit
        // cycle between two rules.
        let mut g = Graph::new();
        g.add_edge(0u32, "a", 1);
        g.add_edge(1, "a", 2);
        g.add_edge(2, "a", 0);
        let mut b = CfgBuilder::new("S");
        b.token("a");
        b.prod("S", &["T", "a"]);
        b.prod("S", &["a"]);
        b.prod("T", &["S"]);
        let got = cfpq(algorithm, &b.build(), &g, None, None).unwrap();
        assert_eq!(got.len(), 9);
    }

    #[test_case(CfpqAlgorithm::Hellings; "hellings")]
    #[test_case(CfpqAlgorithm::Matrix; "matrix")]
    #[test_case(CfpqAlgorithm::Tensor; "tensor")]
    #[test_case(CfpqAlgorithm::Gll; "gll")]
    fn test_idempotent(algorithm: CfpqAlgorithm) {
        let cfg = brackets_cfg();
        let g = lecture_graph();
        let fst = cfpq(algorithm, &cfg, &g, None, None).unwrap();
        let snd = cfpq(algorithm, &cfg, &g, None, None).unwrap();
        assert_eq!(fst, snd);
    }

    #[test_case(CfpqAlgorithm::Hellings; "hellings")]
    #[test_case(CfpqAlgorithm::Matrix; "matrix")]
    #[test_case(CfpqAlgorithm::Tensor; "tensor")]
    #[test_case(CfpqAlgorithm::Gll; "gll")]
    fn test_unknown_node_rejected(algorithm: CfpqAlgorithm) {
        let starts = [42].into_iter().collect();
        let got = cfpq(
            algorithm,
            &brackets_cfg(),
            &lecture_graph(),
            Some(&starts),
            None,
        );
        assert!(matches!(got, Err(QueryError::InvalidNodeSet(_))));
    }

    #[test]
    fn test_algorithms_agree() {
        // A nullable grammar (`a^n b^n`, n >= 0) over the lecture graph
        // exercises epsilon handling in all four engines at once.
        let mut b = CfgBuilder::new("S");
        b.tokens(&["a", "b"]);
        b.prod("S", &["a", "S", "b"]);
        b.prod("S", &[]);
        let cfg = b.build();
        let g = lecture_graph();

        let results = ALGORITHMS
            .iter()
            .map(|&algorithm| cfpq(algorithm, &cfg, &g, None, None).unwrap())
            .collect::<Vec<_>>();
        for w in results.windows(2) {
            assert_eq!(w[0], w[1]);
        }
        // The empty word relates every node to itself.
        for v in 0..4 {
            assert!(results[0].contains(&(v, v)));
        }
    }

    #[test]
    fn test_edge_labels_outside_alphabet_ignored() {
        let mut g = lecture_graph();
        g.add_edge(1u32, "z", 3);
        let starts = [3].into_iter().collect();
        let got = cfpq(
            CfpqAlgorithm::Hellings,
            &brackets_cfg(),
            &g,
            Some(&starts),
            None,
        )
        .unwrap();
        assert_eq!(got, pairs(&[(3, 0), (3, 1)]));
    }
}
