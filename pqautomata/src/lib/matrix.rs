//! The boolean matrix decomposition of a finite automaton.
//!
//! A [`MatrixAutomaton`] is an immutable snapshot of an automaton's
//! transition relation, split into one square [`BitMatrix`] per edge label:
//! entry (`i`, `j`) of label `l`'s matrix is set iff the automaton steps from
//! state `i` to state `j` on `l`. Labels with no transitions simply have no
//! matrix — they behave as the zero matrix throughout.

use fnv::FnvHashMap;
use vob::Vob;

use pqgrammar::{BIdx, RIdx, Rsm, RsmError, Symbol};

use crate::{BitMatrix, Nfa, StIdx};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What one state of the RSM matrix view corresponds to: which rule's box it
/// belongs to and whether it is that box's start and/or a final state.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RsmStateInfo {
    pub ridx: RIdx,
    pub box_start: bool,
    pub box_final: bool,
}

/// A finite automaton as a family of boolean adjacency matrices.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatrixAutomaton {
    states_len: usize,
    starts: Vob,
    finals: Vob,
    matrices: FnvHashMap<String, BitMatrix>,
}

impl MatrixAutomaton {
    /// Decompose `nfa`. State indices carry over unchanged. Cost is linear
    /// in the number of transitions.
    pub fn from_nfa(nfa: &Nfa) -> Self {
        let states_len = nfa.states_len();
        let mut matrices: FnvHashMap<String, BitMatrix> = FnvHashMap::default();
        for (from, label, to) in nfa.edges() {
            matrices
                .entry(label.to_owned())
                .or_insert_with(|| BitMatrix::new(states_len))
                .set(usize::from(from), usize::from(to), true);
        }
        MatrixAutomaton {
            states_len,
            starts: nfa.starts().clone(),
            finals: nfa.finals().clone(),
            matrices,
        }
    }

    /// Decompose `rsm`: one state per (box, box-state) pair, with every box
    /// start state a start state of the whole automaton and every box final
    /// state a final state. Token edges are labeled with the token's name
    /// and call edges with the callee rule's name. Alongside the automaton,
    /// the per-state decode table is returned.
    ///
    /// A call edge referencing a rule with no box is reported as
    /// [`RsmError::UnresolvedNonterminal`] here, before any query runs.
    pub fn from_rsm(rsm: &Rsm) -> Result<(Self, Vec<RsmStateInfo>), RsmError> {
        rsm.validate()?;

        let mut info = Vec::new();
        let mut offsets = vec![0; usize::from(rsm.rules_len())];
        for ridx in rsm.iter_ridxs() {
            if let Some(bx) = rsm.box_for(ridx) {
                offsets[usize::from(ridx)] = info.len();
                for state in 0..bx.states_len() {
                    info.push(RsmStateInfo {
                        ridx,
                        box_start: state == 0,
                        box_final: bx.is_final(BIdx::from_usize(state)),
                    });
                }
            }
        }

        let states_len = info.len();
        let mut starts = Vob::from_elem(false, states_len);
        let mut finals = Vob::from_elem(false, states_len);
        for (i, si) in info.iter().enumerate() {
            if si.box_start {
                starts.set(i, true);
            }
            if si.box_final {
                finals.set(i, true);
            }
        }

        let mut matrices: FnvHashMap<String, BitMatrix> = FnvHashMap::default();
        for ridx in rsm.iter_ridxs() {
            if let Some(bx) = rsm.box_for(ridx) {
                let off = offsets[usize::from(ridx)];
                for state in 0..bx.states_len() {
                    for (sym, to) in bx.edges(BIdx::from_usize(state)) {
                        let label = match sym {
                            Symbol::Token(t) => rsm.token_name(t),
                            Symbol::Rule(r) => rsm.rule_name(r),
                        };
                        matrices
                            .entry(label.to_owned())
                            .or_insert_with(|| BitMatrix::new(states_len))
                            .set(off + state, off + usize::from(to), true);
                    }
                }
            }
        }

        Ok((
            MatrixAutomaton {
                states_len,
                starts,
                finals,
                matrices,
            },
            info,
        ))
    }

    /// How many states does this automaton have?
    pub fn states_len(&self) -> usize {
        self.states_len
    }

    /// Is `state` a start state?
    pub fn is_start(&self, state: StIdx) -> bool {
        self.starts[usize::from(state)]
    }

    /// Is `state` a final state?
    pub fn is_final(&self, state: StIdx) -> bool {
        self.finals[usize::from(state)]
    }

    /// Return the matrix of `label`, or `None` if no transition carries it.
    pub fn matrix(&self, label: &str) -> Option<&BitMatrix> {
        self.matrices.get(label)
    }

    /// Ensure `label` has a matrix, creating a zero one if needed. Used to
    /// open a channel that later calls to [`set`](Self::set) will fill.
    pub fn insert_empty_matrix(&mut self, label: &str) {
        let states_len = self.states_len;
        self.matrices
            .entry(label.to_owned())
            .or_insert_with(|| BitMatrix::new(states_len));
    }

    /// Set the entry (`from`, `to`) of `label`'s matrix, creating the matrix
    /// if needed.
    ///
    /// # Panics
    ///
    /// If either state doesn't exist.
    pub fn set(&mut self, label: &str, from: StIdx, to: StIdx) {
        let states_len = self.states_len;
        self.matrices
            .entry(label.to_owned())
            .or_insert_with(|| BitMatrix::new(states_len))
            .set(usize::from(from), usize::from(to), true);
    }

    /// How many entries are set across all matrices?
    pub fn count_ones(&self) -> usize {
        self.matrices.values().map(|m| m.count_ones()).sum()
    }

    /// Does this automaton accept `word`? A label with no matrix empties the
    /// state frontier: unknown symbols are a silent reject, not an error.
    pub fn accepts(&self, word: &[&str]) -> bool {
        let mut current = self.starts.clone();
        for label in word {
            let mut next = Vob::from_elem(false, self.states_len);
            if let Some(m) = self.matrices.get(*label) {
                for state in current.iter_set_bits(..) {
                    next.or(m.row(state));
                }
            }
            current = next;
        }
        current.and(&self.finals);
        current.iter_set_bits(..).next().is_some()
    }

    /// The reflexive transitive closure of the union of all matrices: entry
    /// (`i`, `j`) is set iff some (possibly empty) path leads from state `i`
    /// to state `j`. Computed by repeated boolean squaring; since the
    /// reflexive matrix only grows under squaring and any simple path has
    /// fewer than `states_len` edges, `states_len` squarings bound the loop.
    pub fn transitive_closure(&self) -> BitMatrix {
        let mut tc = BitMatrix::new(self.states_len);
        for m in self.matrices.values() {
            tc.or(m);
        }
        tc.set_diagonal();
        for _ in 0..self.states_len {
            let next = tc.mul(&tc);
            if next == tc {
                break;
            }
            tc = next;
        }
        tc
    }

    /// Is this automaton's language empty, i.e. does no path connect a start
    /// state to a final state?
    pub fn is_empty(&self) -> bool {
        let tc = self.transitive_closure();
        for s in self.starts.iter_set_bits(..) {
            for f in self.finals.iter_set_bits(..) {
                if tc.get(s, f) {
                    return false;
                }
            }
        }
        true
    }

    /// The product automaton recognising the intersection of the two
    /// languages. States are pairs, indexed `i * other.states_len() + j`;
    /// per-label matrices are Kronecker products over the *shared* alphabet
    /// (a label absent from either side matches nothing and contributes no
    /// matrix); start and final sets are products of the operands'.
    pub fn intersect(&self, other: &MatrixAutomaton) -> MatrixAutomaton {
        let states_len = self.states_len * other.states_len;
        let mut matrices = FnvHashMap::default();
        for (label, m) in &self.matrices {
            if let Some(om) = other.matrices.get(label) {
                matrices.insert(label.clone(), m.kron(om));
            }
        }
        let mut starts = Vob::from_elem(false, states_len);
        for i in self.starts.iter_set_bits(..) {
            for j in other.starts.iter_set_bits(..) {
                starts.set(i * other.states_len + j, true);
            }
        }
        let mut finals = Vob::from_elem(false, states_len);
        for i in self.finals.iter_set_bits(..) {
            for j in other.finals.iter_set_bits(..) {
                finals.set(i * other.states_len + j, true);
            }
        }
        MatrixAutomaton {
            states_len,
            starts,
            finals,
            matrices,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pqgrammar::CfgBuilder;

    /// An automaton for `a*b`.
    fn a_star_b() -> MatrixAutomaton {
        let mut nfa = Nfa::new();
        let s0 = nfa.add_state();
        let s1 = nfa.add_state();
        nfa.set_start(s0);
        nfa.set_final(s1);
        nfa.add_edge(s0, "a", s0);
        nfa.add_edge(s0, "b", s1);
        MatrixAutomaton::from_nfa(&nfa)
    }

    /// An automaton over {a} whose number of `a`s must be odd/even.
    fn parity(accept_odd: bool) -> MatrixAutomaton {
        let mut nfa = Nfa::new();
        let even = nfa.add_state();
        let odd = nfa.add_state();
        nfa.set_start(even);
        nfa.set_final(if accept_odd { odd } else { even });
        nfa.add_edge(even, "a", odd);
        nfa.add_edge(odd, "a", even);
        MatrixAutomaton::from_nfa(&nfa)
    }

    /// All words over `alphabet` of length at most `max_len`.
    fn words<'a>(alphabet: &[&'a str], max_len: usize) -> Vec<Vec<&'a str>> {
        let mut out = vec![vec![]];
        let mut last = vec![vec![]];
        for _ in 0..max_len {
            let mut next = Vec::new();
            for w in &last {
                for l in alphabet {
                    let mut w2 = w.clone();
                    w2.push(*l);
                    next.push(w2);
                }
            }
            out.extend(next.iter().cloned());
            last = next;
        }
        out
    }

    #[test]
    fn test_accepts() {
        let m = a_star_b();
        assert!(m.accepts(&["b"]));
        assert!(m.accepts(&["a", "b"]));
        assert!(m.accepts(&["a", "a", "a", "b"]));
        assert!(!m.accepts(&[]));
        assert!(!m.accepts(&["a"]));
        assert!(!m.accepts(&["b", "a"]));
        assert!(!m.accepts(&["b", "b"]));
    }

    #[test]
    fn test_accepts_unknown_symbol_is_reject() {
        let m = a_star_b();
        assert!(!m.accepts(&["z"]));
        assert!(!m.accepts(&["a", "z", "b"]));
    }

    #[test]
    fn test_closure_reflexive_and_idempotent() {
        let m = a_star_b();
        let tc = m.transitive_closure();
        for i in 0..m.states_len() {
            assert!(tc.get(i, i));
        }
        assert_eq!(tc.mul(&tc), tc);
    }

    #[test]
    fn test_is_empty_against_accepts() {
        // a*b accepts plenty of short words; an odd/even parity clash
        // accepts none at all.
        let nonempty = a_star_b();
        let empty = parity(true).intersect(&parity(false));
        for (m, expected_empty) in [(&nonempty, false), (&empty, true)] {
            let accepted_some = words(&["a", "b"], 4).iter().any(|w| m.accepts(w));
            assert_eq!(m.is_empty(), expected_empty);
            assert_eq!(accepted_some, !expected_empty);
        }
    }

    #[test]
    fn test_intersect() {
        let odd = parity(true);
        let even = parity(false);
        let both = odd.intersect(&even);
        assert_eq!(both.states_len(), 4);
        assert!(both.is_start(StIdx(0)));
        // Final pair: odd's final (state 1) with even's final (state 0).
        assert!(both.is_final(StIdx(2)));
        assert!(both.is_empty());
        // Intersecting with itself changes nothing about the language.
        let same = odd.intersect(&odd);
        assert!(same.accepts(&["a"]));
        assert!(!same.accepts(&["a", "a"]));
    }

    #[test]
    fn test_from_rsm() {
        let mut b = CfgBuilder::new("S");
        b.tokens(&["a", "b"]);
        b.prod("S", &["a", "S", "b"]);
        b.prod("S", &["a", "b"]);
        let rsm = Rsm::from_cfg(&b.build());
        let (m, info) = MatrixAutomaton::from_rsm(&rsm).unwrap();

        assert_eq!(m.states_len(), 5);
        assert_eq!(info.len(), 5);
        assert_eq!(info.iter().filter(|si| si.box_start).count(), 1);
        assert_eq!(info.iter().filter(|si| si.box_final).count(), 2);
        assert!(m.matrix("a").is_some());
        assert!(m.matrix("b").is_some());
        // The recursive `S` call shows up as a matrix of its own.
        assert!(m.matrix("S").is_some());
        assert_eq!(m.matrix("S").unwrap().count_ones(), 1);
    }

    #[test]
    fn test_from_rsm_rejects_dangling_call() {
        use pqgrammar::RsmBox;
        let mut rsm = Rsm::new("S");
        let missing = rsm.rule("T");
        let mut bx = RsmBox::new();
        let st = bx.add_state();
        bx.add_edge(RsmBox::start_state(), Symbol::Rule(missing), st);
        bx.set_final(st);
        rsm.add_box(rsm.start_rule(), bx);
        assert_eq!(
            MatrixAutomaton::from_rsm(&rsm).map(|_| ()),
            Err(RsmError::UnresolvedNonterminal {
                rule: "T".to_owned()
            })
        );
    }
}
