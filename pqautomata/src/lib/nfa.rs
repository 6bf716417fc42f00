//! Programmatically assembled nondeterministic finite automata.
//!
//! An [`Nfa`] is the neutral input form: pattern automata arrive here from
//! upstream regex tooling, and graphs project themselves into one through
//! [`Graph::to_nfa`](crate::Graph::to_nfa). Nothing here interprets the
//! automaton — that is [`MatrixAutomaton`](crate::MatrixAutomaton)'s job.

use vob::Vob;

use crate::StIdx;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A nondeterministic finite automaton over string labels.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Nfa {
    starts: Vob,
    finals: Vob,
    edges: Vec<(StIdx, String, StIdx)>,
}

impl Nfa {
    /// Create an automaton with no states.
    pub fn new() -> Self {
        Nfa {
            starts: Vob::new(),
            finals: Vob::new(),
            edges: Vec::new(),
        }
    }

    /// Add a fresh state, neither start nor final.
    pub fn add_state(&mut self) -> StIdx {
        self.starts.push(false);
        self.finals.push(false);
        StIdx::from_usize(self.starts.len() - 1)
    }

    /// Mark `state` as a start state.
    ///
    /// # Panics
    ///
    /// If `state` doesn't exist.
    pub fn set_start(&mut self, state: StIdx) {
        self.starts.set(usize::from(state), true);
    }

    /// Mark `state` as a final state.
    ///
    /// # Panics
    ///
    /// If `state` doesn't exist.
    pub fn set_final(&mut self, state: StIdx) {
        self.finals.set(usize::from(state), true);
    }

    /// Add the transition `from -label-> to`. Parallel transitions with the
    /// same label are tolerated and collapse in the matrix view.
    ///
    /// # Panics
    ///
    /// If either state doesn't exist.
    pub fn add_edge(&mut self, from: StIdx, label: &str, to: StIdx) {
        assert!(usize::from(from) < self.states_len());
        assert!(usize::from(to) < self.states_len());
        self.edges.push((from, label.to_owned(), to));
    }

    /// How many states does this automaton have?
    pub fn states_len(&self) -> usize {
        self.starts.len()
    }

    /// Is `state` a start state?
    pub fn is_start(&self, state: StIdx) -> bool {
        self.starts[usize::from(state)]
    }

    /// Is `state` a final state?
    pub fn is_final(&self, state: StIdx) -> bool {
        self.finals[usize::from(state)]
    }

    /// The start states as a bit vector over state indices.
    pub fn starts(&self) -> &Vob {
        &self.starts
    }

    /// The final states as a bit vector over state indices.
    pub fn finals(&self) -> &Vob {
        &self.finals
    }

    /// Return an iterator over all transitions.
    pub fn edges(&self) -> impl Iterator<Item = (StIdx, &str, StIdx)> {
        self.edges.iter().map(|(f, l, t)| (*f, l.as_str(), *t))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build() {
        let mut nfa = Nfa::new();
        let s0 = nfa.add_state();
        let s1 = nfa.add_state();
        nfa.set_start(s0);
        nfa.set_final(s1);
        nfa.add_edge(s0, "a", s1);
        nfa.add_edge(s1, "a", s1);

        assert_eq!(nfa.states_len(), 2);
        assert!(nfa.is_start(s0) && !nfa.is_start(s1));
        assert!(nfa.is_final(s1) && !nfa.is_final(s0));
        assert_eq!(nfa.edges().count(), 2);
    }
}
