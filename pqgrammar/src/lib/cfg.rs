//! The context-free grammar representation.
//!
//! A [`Cfg`] is immutable: it is assembled through a [`CfgBuilder`], which
//! interns rule and token names and resolves production bodies as they are
//! added. Upstream components that read grammars from text are expected to
//! drive the builder; nothing in this crate parses grammar text itself.

use indexmap::IndexSet;

use crate::{PIdx, RIdx, Symbol, TIdx};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An immutable context-free grammar with interned rule and token names.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cfg {
    rule_names: IndexSet<String>,
    token_names: IndexSet<String>,
    /// The bodies of all productions, indexed by `PIdx`.
    prods: Vec<Vec<Symbol>>,
    /// Maps a production index to the index of the rule it belongs to.
    prods_rules: Vec<RIdx>,
    /// Maps a rule index to the indices of its productions.
    rules_prods: Vec<Vec<PIdx>>,
    start_rule: RIdx,
}

impl Cfg {
    /// How many rules does this grammar have?
    pub fn rules_len(&self) -> RIdx {
        RIdx::from_usize(self.rule_names.len())
    }

    /// Return an iterator which produces (in order from `0..rules_len()`) all
    /// this grammar's valid `RIdx`s.
    pub fn iter_ridxs(&self) -> impl Iterator<Item = RIdx> + use<> {
        (0..self.rule_names.len()).map(RIdx::from_usize)
    }

    /// How many tokens does this grammar have?
    pub fn tokens_len(&self) -> TIdx {
        TIdx::from_usize(self.token_names.len())
    }

    /// How many productions does this grammar have?
    pub fn prods_len(&self) -> PIdx {
        PIdx::from_usize(self.prods.len())
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

    /// Return the index of the rule named `n` or `None` if it doesn't exist.
    pub fn rule_idx(&self, n: &str) -> Option<RIdx> {
        self.rule_names.get_index_of(n).map(RIdx::from_usize)
    }

    /// Return the index of the token named `n` or `None` if it doesn't exist.
    pub fn token_idx(&self, n: &str) -> Option<TIdx> {
        self.token_names.get_index_of(n).map(TIdx::from_usize)
    }

    /// Return this grammar's start rule.
    pub fn start_rule(&self) -> RIdx {
        self.start_rule
    }

    /// Return the body of production `pidx`.
    ///
    /// # Panics
    ///
    /// If `pidx` doesn't exist.
    pub fn prod(&self, pidx: PIdx) -> &[Symbol] {
        &self.prods[usize::from(pidx)]
    }

    /// Return the index of the rule production `pidx` belongs to.
    ///
    /// # Panics
    ///
    /// If `pidx` doesn't exist.
    pub fn prod_to_rule(&self, pidx: PIdx) -> RIdx {
        self.prods_rules[usize::from(pidx)]
    }

    /// Return the production indices of rule `ridx`.
    ///
    /// # Panics
    ///
    /// If `ridx` doesn't exist.
    pub fn rule_to_prods(&self, ridx: RIdx) -> &[PIdx] {
        &self.rules_prods[usize::from(ridx)]
    }
}

/// Assembles a [`Cfg`] production by production.
///
/// Tokens must be declared before they are referenced; any other name in a
/// production body (or on its left-hand side) is interned as a rule. Rules
/// referenced but never given a production are legitimate — they simply
/// generate nothing, and the weak-normal-form transformation removes them.
pub struct CfgBuilder {
    rule_names: IndexSet<String>,
    token_names: IndexSet<String>,
    prods: Vec<Vec<Symbol>>,
    prods_rules: Vec<RIdx>,
}

impl CfgBuilder {
    /// Start building a grammar whose start rule is named `start_rule`.
    pub fn new(start_rule: &str) -> Self {
        let mut rule_names = IndexSet::new();
        rule_names.insert(start_rule.to_owned());
        CfgBuilder {
            rule_names,
            token_names: IndexSet::new(),
            prods: Vec::new(),
            prods_rules: Vec::new(),
        }
    }

    /// Declare `n` as a token.
    ///
    /// # Panics
    ///
    /// If `n` is already interned as a rule.
    pub fn token(&mut self, n: &str) -> &mut Self {
        assert!(
            !self.rule_names.contains(n),
            "'{}' is already a rule name",
            n
        );
        self.token_names.insert(n.to_owned());
        self
    }

    /// Declare several tokens at once.
    pub fn tokens(&mut self, ns: &[&str]) -> &mut Self {
        for n in ns {
            self.token(n);
        }
        self
    }

    /// Add the production `lhs: body`, where each name in `body` refers to a
    /// previously declared token or to a rule (interned on first sight). An
    /// empty `body` is an epsilon production.
    ///
    /// # Panics
    ///
    /// If `lhs` was declared as a token.
    pub fn prod(&mut self, lhs: &str, body: &[&str]) -> &mut Self {
        assert!(
            !self.token_names.contains(lhs),
            "'{}' is a token and cannot have productions",
            lhs
        );
        let (lidx, _) = self.rule_names.insert_full(lhs.to_owned());
        let body = body
            .iter()
            .map(|n| match self.token_names.get_index_of(*n) {
                Some(tidx) => Symbol::Token(TIdx::from_usize(tidx)),
                None => {
                    let (ridx, _) = self.rule_names.insert_full((*n).to_owned());
                    Symbol::Rule(RIdx::from_usize(ridx))
                }
            })
            .collect();
        self.prods.push(body);
        self.prods_rules.push(RIdx::from_usize(lidx));
        self
    }

    /// Finish building, producing the immutable grammar.
    pub fn build(self) -> Cfg {
        let mut rules_prods = vec![Vec::new(); self.rule_names.len()];
        for (pidx, &ridx) in self.prods_rules.iter().enumerate() {
            rules_prods[usize::from(ridx)].push(PIdx::from_usize(pidx));
        }
        Cfg {
            rule_names: self.rule_names,
            token_names: self.token_names,
            prods: self.prods,
            prods_rules: self.prods_rules,
            rules_prods,
            // The start rule is interned first in `new`.
            start_rule: RIdx(0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_and_lookup() {
        let mut b = CfgBuilder::new("S");
        b.tokens(&["a", "b"]);
        b.prod("S", &["a", "S", "b"]);
        b.prod("S", &["a", "b"]);
        let cfg = b.build();

        assert_eq!(usize::from(cfg.rules_len()), 1);
        assert_eq!(usize::from(cfg.tokens_len()), 2);
        assert_eq!(usize::from(cfg.prods_len()), 2);
        assert_eq!(cfg.start_rule(), cfg.rule_idx("S").unwrap());
        assert_eq!(cfg.rule_name(cfg.start_rule()), "S");

        let s = cfg.rule_idx("S").unwrap();
        let a = cfg.token_idx("a").unwrap();
        let b = cfg.token_idx("b").unwrap();
        assert_eq!(cfg.rule_to_prods(s).len(), 2);
        let p0 = cfg.rule_to_prods(s)[0];
        assert_eq!(
            cfg.prod(p0),
            &[Symbol::Token(a), Symbol::Rule(s), Symbol::Token(b)]
        );
        assert_eq!(cfg.prod_to_rule(p0), s);
    }

    #[test]
    fn test_rules_interned_on_reference() {
        let mut b = CfgBuilder::new("S");
        b.token("c");
        b.prod("S", &["A", "c"]);
        let cfg = b.build();
        // "A" was referenced but never defined: it exists, with no
        // productions.
        let a = cfg.rule_idx("A").unwrap();
        assert!(cfg.rule_to_prods(a).is_empty());
    }

    #[test]
    fn test_epsilon_prod() {
        let mut b = CfgBuilder::new("S");
        b.prod("S", &[]);
        let cfg = b.build();
        let p = cfg.rule_to_prods(cfg.start_rule())[0];
        assert!(cfg.prod(p).is_empty());
    }

    #[test]
    #[should_panic]
    fn test_token_lhs_rejected() {
        let mut b = CfgBuilder::new("S");
        b.token("a");
        b.prod("a", &[]);
    }
}
