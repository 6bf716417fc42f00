//! The recursive state machine (RSM) view of a grammar.
//!
//! An RSM gives every rule a small deterministic automaton "box" whose
//! alphabet mixes tokens with rule names: a token-labeled edge consumes one
//! graph edge, while a rule-labeled edge is a *call* into the named rule's
//! box. A complete walk from a box's start state to one of its final states
//! is a derivation of that rule.

use std::{error::Error, fmt};

use fnv::FnvHashMap;
use indexmap::IndexSet;
use vob::Vob;

use crate::{BIdx, Cfg, RIdx, Symbol, TIdx};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The errors an RSM view can produce.
#[derive(Debug, Eq, PartialEq)]
pub enum RsmError {
    /// A call edge references a rule which owns no box.
    UnresolvedNonterminal { rule: String },
}

impl Error for RsmError {}

impl fmt::Display for RsmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RsmError::UnresolvedNonterminal { rule } => {
                write!(f, "Call edge references rule '{}' which has no box", rule)
            }
        }
    }
}

/// One rule's box: a deterministic automaton over tokens and rule names.
///
/// State `BIdx(0)` is always the start state. Determinism is structural: a
/// state holds at most one outgoing edge per symbol.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RsmBox {
    finals: Vob,
    edges: Vec<FnvHashMap<Symbol, BIdx>>,
}

impl RsmBox {
    /// Create a box holding only its start state.
    pub fn new() -> Self {
        RsmBox {
            finals: Vob::from_elem(false, 1),
            edges: vec![FnvHashMap::default()],
        }
    }

    /// The start state of every box.
    pub fn start_state() -> BIdx {
        BIdx(0)
    }

    /// Add a fresh state.
    pub fn add_state(&mut self) -> BIdx {
        self.finals.push(false);
        self.edges.push(FnvHashMap::default());
        BIdx::from_usize(self.edges.len() - 1)
    }

    /// Mark `state` as final.
    ///
    /// # Panics
    ///
    /// If `state` doesn't exist.
    pub fn set_final(&mut self, state: BIdx) {
        self.finals.set(usize::from(state), true);
    }

    /// Add the edge `from -sym-> to`.
    ///
    /// # Panics
    ///
    /// If either state doesn't exist, or if `from` already has an edge for
    /// `sym` pointing elsewhere (boxes are deterministic).
    pub fn add_edge(&mut self, from: BIdx, sym: Symbol, to: BIdx) {
        assert!(usize::from(to) < self.edges.len());
        let old = self.edges[usize::from(from)].insert(sym, to);
        assert!(
            old.is_none() || old == Some(to),
            "Conflicting edges for one symbol"
        );
    }

    /// How many states does this box have?
    pub fn states_len(&self) -> usize {
        self.edges.len()
    }

    /// Is `state` final?
    ///
    /// # Panics
    ///
    /// If `state` doesn't exist.
    pub fn is_final(&self, state: BIdx) -> bool {
        self.finals[usize::from(state)]
    }

    /// Return the outgoing edges of `state`.
    ///
    /// # Panics
    ///
    /// If `state` doesn't exist.
    pub fn edges(&self, state: BIdx) -> impl Iterator<Item = (Symbol, BIdx)> {
        self.edges[usize::from(state)].iter().map(|(&s, &t)| (s, t))
    }

    /// Follow the edge for `sym` out of `state`, if there is one.
    pub fn edge(&self, state: BIdx, sym: Symbol) -> Option<BIdx> {
        self.edges[usize::from(state)].get(&sym).copied()
    }
}

/// A recursive state machine: interned rule and token names, a designated
/// initial rule, and at most one box per rule.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rsm {
    rule_names: IndexSet<String>,
    token_names: IndexSet<String>,
    start_rule: RIdx,
    boxes: Vec<Option<RsmBox>>,
}

impl Rsm {
    /// Create an RSM whose initial rule is named `start_rule`, with no boxes
    /// yet.
    pub fn new(start_rule: &str) -> Self {
        let mut rule_names = IndexSet::new();
        rule_names.insert(start_rule.to_owned());
        Rsm {
            rule_names,
            token_names: IndexSet::new(),
            start_rule: RIdx(0),
            boxes: vec![None],
        }
    }

    /// Build the RSM of `cfg`: one box per rule, laying the rule's
    /// production bodies out as a prefix-sharing trie with each body's end
    /// state final. The result is deterministic by construction and has a
    /// box for every rule, so [`validate`](Self::validate) always succeeds
    /// on it.
    pub fn from_cfg(cfg: &Cfg) -> Self {
        let mut rsm = Rsm::new(cfg.rule_name(cfg.start_rule()));
        for ridx in cfg.iter_ridxs() {
            rsm.rule(cfg.rule_name(ridx));
        }
        for i in 0..usize::from(cfg.tokens_len()) {
            rsm.token(cfg.token_name(TIdx::from_usize(i)));
        }
        // Rule and token tables are carried over wholesale, so symbol
        // indices are identical in both namespaces.
        for ridx in cfg.iter_ridxs() {
            let mut bx = RsmBox::new();
            for &pidx in cfg.rule_to_prods(ridx) {
                let mut cur = RsmBox::start_state();
                for &sym in cfg.prod(pidx) {
                    cur = match bx.edge(cur, sym) {
                        Some(next) => next,
                        None => {
                            let next = bx.add_state();
                            bx.add_edge(cur, sym, next);
                            next
                        }
                    };
                }
                bx.set_final(cur);
            }
            rsm.add_box(ridx, bx);
        }
        rsm
    }

    /// Intern `n` as a rule, returning its index.
    ///
    /// # Panics
    ///
    /// If `n` is already interned as a token.
    pub fn rule(&mut self, n: &str) -> RIdx {
        assert!(
            !self.token_names.contains(n),
            "'{}' is already a token name",
            n
        );
        let (i, new) = self.rule_names.insert_full(n.to_owned());
        if new {
            self.boxes.push(None);
        }
        RIdx::from_usize(i)
    }

    /// Intern `n` as a token, returning its index.
    ///
    /// # Panics
    ///
    /// If `n` is already interned as a rule.
    pub fn token(&mut self, n: &str) -> TIdx {
        assert!(
            !self.rule_names.contains(n),
            "'{}' is already a rule name",
            n
        );
        let (i, _) = self.token_names.insert_full(n.to_owned());
        TIdx::from_usize(i)
    }

    /// Assign `bx` as the box of rule `ridx`, replacing any previous box.
    ///
    /// # Panics
    ///
    /// If `ridx` doesn't exist.
    pub fn add_box(&mut self, ridx: RIdx, bx: RsmBox) {
        self.boxes[usize::from(ridx)] = Some(bx);
    }

    /// Return this RSM's initial rule.
    pub fn start_rule(&self) -> RIdx {
        self.start_rule
    }

    /// How many rules does this RSM have?
    pub fn rules_len(&self) -> RIdx {
        RIdx::from_usize(self.rule_names.len())
    }

    /// Return an iterator which produces (in order from `0..rules_len()`) all
    /// this RSM's valid `RIdx`s.
    pub fn iter_ridxs(&self) -> impl Iterator<Item = RIdx> + use<> {
        (0..self.rule_names.len()).map(RIdx::from_usize)
    }

    /// Return the name of rule `ridx`.
    ///
    /// # Panics
    ///
    /// If `ridx` doesn't exist.
    pub fn rule_name(&self, ridx: RIdx) -> &str {
        self.rule_names.get_index(usize::from(ridx)).unwrap()
    }

    /// Return the name of token `tidx`.
    ///
    /// # Panics
    ///
    /// If `tidx` doesn't exist.
    pub fn token_name(&self, tidx: TIdx) -> &str {
        self.token_names.get_index(usize::from(tidx)).unwrap()
    }

    /// Return the index of the token named `n` or `None` if it doesn't exist.
    pub fn token_idx(&self, n: &str) -> Option<TIdx> {
        self.token_names.get_index_of(n).map(TIdx::from_usize)
    }

    /// Return the box of rule `ridx`, or `None` if it has none.
    ///
    /// # Panics
    ///
    /// If `ridx` doesn't exist.
    pub fn box_for(&self, ridx: RIdx) -> Option<&RsmBox> {
        self.boxes[usize::from(ridx)].as_ref()
    }

    /// Check that the initial rule and every rule referenced by a call edge
    /// own a box. The automaton views call this before doing anything else,
    /// so that a dangling call is reported as a construction error rather
    /// than surfacing mid-query.
    pub fn validate(&self) -> Result<(), RsmError> {
        if self.boxes[usize::from(self.start_rule)].is_none() {
            return Err(RsmError::UnresolvedNonterminal {
                rule: self.rule_name(self.start_rule).to_owned(),
            });
        }
        for bx in self.boxes.iter().flatten() {
            for state in 0..bx.states_len() {
                for (sym, _) in bx.edges(BIdx::from_usize(state)) {
                    if let Symbol::Rule(r) = sym {
                        if self.boxes[usize::from(r)].is_none() {
                            return Err(RsmError::UnresolvedNonterminal {
                                rule: self.rule_name(r).to_owned(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::CfgBuilder;

    fn brackets_cfg() -> Cfg {
        let mut b = CfgBuilder::new("S");
        b.tokens(&["a", "b"]);
        b.prod("S", &["a", "S", "b"]);
        b.prod("S", &["a", "b"]);
        b.build()
    }

    #[test]
    fn test_from_cfg_shares_prefixes() {
        let cfg = brackets_cfg();
        let rsm = Rsm::from_cfg(&cfg);
        let s = rsm.start_rule();
        let bx = rsm.box_for(s).unwrap();
        // `a S b` and `a b` share the state after `a`, so the trie has five
        // states: start, after-a, after-aS, after-aSb, after-ab.
        assert_eq!(bx.states_len(), 5);
        let a = Symbol::Token(rsm.token_idx("a").unwrap());
        let after_a = bx.edge(RsmBox::start_state(), a).unwrap();
        assert!(bx.edge(after_a, Symbol::Rule(s)).is_some());
        assert!(!bx.is_final(after_a));
    }

    #[test]
    fn test_from_cfg_epsilon_body() {
        let mut b = CfgBuilder::new("S");
        b.prod("S", &[]);
        let rsm = Rsm::from_cfg(&b.build());
        let bx = rsm.box_for(rsm.start_rule()).unwrap();
        assert_eq!(bx.states_len(), 1);
        assert!(bx.is_final(RsmBox::start_state()));
    }

    #[test]
    fn test_validate_rejects_dangling_call() {
        let mut rsm = Rsm::new("S");
        let t = rsm.token("a");
        let missing = rsm.rule("T");
        let mut bx = RsmBox::new();
        let st = bx.add_state();
        bx.add_edge(RsmBox::start_state(), Symbol::Token(t), st);
        bx.add_edge(st, Symbol::Rule(missing), st);
        bx.set_final(st);
        rsm.add_box(rsm.start_rule(), bx);
        assert_eq!(
            rsm.validate(),
            Err(RsmError::UnresolvedNonterminal {
                rule: "T".to_owned()
            })
        );
    }

    #[test]
    fn test_validate_accepts_from_cfg() {
        let rsm = Rsm::from_cfg(&brackets_cfg());
        assert!(rsm.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_initial_box() {
        let rsm = Rsm::new("S");
        assert_eq!(
            rsm.validate(),
            Err(RsmError::UnresolvedNonterminal {
                rule: "S".to_owned()
            })
        );
    }
}
