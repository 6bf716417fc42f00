//! Transformation of a grammar into weak Chomsky normal form.
//!
//! In weak normal form every production is one of exactly three kinds:
//!
//!   * epsilon: `A: ;`
//!   * terminal: `A: 'a';`
//!   * binary: `A: B C;`
//!
//! Unlike full Chomsky normal form, epsilon productions are kept, so the
//! transformation preserves the grammar's language exactly (including the
//! empty word). The path query engines only ever consume grammars in this
//! form.

use fnv::FnvHashSet;
use indexmap::IndexSet;
use vob::Vob;

use crate::{Cfg, RIdx, Symbol, TIdx};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A grammar in weak Chomsky normal form.
///
/// The rule table is the input grammar's, extended with the fresh rules
/// introduced by terminal lifting (named `~t` for a token `t`) and
/// binarization (named `A~0`, `A~1`, ... for a rule `A`); the token table is
/// carried over unchanged. Productions are partitioned into the three kinds
/// and exposed as flat lists.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeakNf {
    rule_names: IndexSet<String>,
    token_names: IndexSet<String>,
    start_rule: RIdx,
    epsilon_prods: Vec<RIdx>,
    term_prods: Vec<(RIdx, TIdx)>,
    binary_prods: Vec<(RIdx, RIdx, RIdx)>,
    /// Maps a token index to the rules with a terminal production for it.
    term_prods_by_token: Vec<Vec<RIdx>>,
}

impl WeakNf {
    /// Transform `cfg` into weak normal form. In order: unit-production
    /// elimination, useless-symbol removal (non-generating, then
    /// unreachable), terminal lifting in bodies of length two or more, and
    /// binarization of bodies of length three or more.
    pub fn new(cfg: &Cfg) -> Self {
        let mut rule_names = IndexSet::new();
        for ridx in cfg.iter_ridxs() {
            rule_names.insert(cfg.rule_name(ridx).to_owned());
        }
        let mut token_names = IndexSet::new();
        for i in 0..usize::from(cfg.tokens_len()) {
            token_names.insert(cfg.token_name(TIdx::from_usize(i)).to_owned());
        }

        let mut prods = eliminate_unit_prods(cfg);
        remove_useless(cfg, &mut prods);

        // Lift terminals out of bodies of length >= 2, so that those bodies
        // mention rules only. One wrapper rule per token, shared by every
        // production that needs it.
        let mut wrappers: Vec<Option<RIdx>> = vec![None; usize::from(cfg.tokens_len())];
        for (_, body) in prods.iter_mut().filter(|(_, body)| body.len() >= 2) {
            for sym in body.iter_mut() {
                if let Symbol::Token(tidx) = *sym {
                    let w = match wrappers[usize::from(tidx)] {
                        Some(w) => w,
                        None => {
                            let name = format!("~{}", token_names.get_index(usize::from(tidx)).unwrap());
                            let w = fresh_rule(&mut rule_names, &name);
                            wrappers[usize::from(tidx)] = Some(w);
                            w
                        }
                    };
                    *sym = Symbol::Rule(w);
                }
            }
        }
        for (tidx, w) in wrappers.iter().enumerate() {
            if let Some(w) = w {
                prods.push((*w, vec![Symbol::Token(TIdx::from_usize(tidx))]));
            }
        }

        // Binarize bodies of length >= 3 into chains of fresh continuation
        // rules: `A: X1 X2 X3 X4;` becomes `A: X1 A~0; A~0: X2 A~1;
        // A~1: X3 X4;`.
        let mut binarized = Vec::with_capacity(prods.len());
        for (lhs, body) in prods {
            if body.len() <= 2 {
                binarized.push((lhs, body));
                continue;
            }
            let lhs_name = rule_names.get_index(usize::from(lhs)).unwrap().clone();
            let mut cur = lhs;
            for (i, sym) in body[..body.len() - 2].iter().enumerate() {
                let cont = fresh_rule(&mut rule_names, &format!("{}~{}", lhs_name, i));
                binarized.push((cur, vec![*sym, Symbol::Rule(cont)]));
                cur = cont;
            }
            binarized.push((cur, body[body.len() - 2..].to_vec()));
        }

        let mut epsilon_prods = Vec::new();
        let mut term_prods = Vec::new();
        let mut binary_prods = Vec::new();
        let mut term_prods_by_token = vec![Vec::new(); token_names.len()];
        for (lhs, body) in binarized {
            match body[..] {
                [] => epsilon_prods.push(lhs),
                [Symbol::Token(tidx)] => {
                    term_prods.push((lhs, tidx));
                    term_prods_by_token[usize::from(tidx)].push(lhs);
                }
                [Symbol::Rule(fst), Symbol::Rule(snd)] => binary_prods.push((lhs, fst, snd)),
                // Unit productions were eliminated up front and lifting
                // leaves no tokens in two-symbol bodies.
                _ => panic!("Internal error"),
            }
        }

        log::debug!(
            "weak normal form: {} rules, {} epsilon / {} terminal / {} binary productions",
            rule_names.len(),
            epsilon_prods.len(),
            term_prods.len(),
            binary_prods.len()
        );

        WeakNf {
            rule_names,
            token_names,
            start_rule: cfg.start_rule(),
            epsilon_prods,
            term_prods,
            binary_prods,
            term_prods_by_token,
        }
    }

    /// How many rules does this grammar have (fresh rules included)?
    pub fn rules_len(&self) -> RIdx {
        RIdx::from_usize(self.rule_names.len())
    }

    /// Return the name of rule `ridx`.
    ///
    /// # Panics
    ///
    /// If `ridx` doesn't exist.
    pub fn rule_name(&self, ridx: RIdx) -> &str {
        self.rule_names.get_index(usize::from(ridx)).unwrap()
    }

    /// Return the index of the token named `n` or `None` if it doesn't exist.
    pub fn token_idx(&self, n: &str) -> Option<TIdx> {
        self.token_names.get_index_of(n).map(TIdx::from_usize)
    }

    /// Return this grammar's start rule.
    pub fn start_rule(&self) -> RIdx {
        self.start_rule
    }

    /// All epsilon productions `A: ;`, as their left-hand sides.
    pub fn epsilon_prods(&self) -> &[RIdx] {
        &self.epsilon_prods
    }

    /// All terminal productions `A: 'a';`, as `(A, a)` pairs.
    pub fn term_prods(&self) -> &[(RIdx, TIdx)] {
        &self.term_prods
    }

    /// All binary productions `A: B C;`, as `(A, B, C)` triples.
    pub fn binary_prods(&self) -> &[(RIdx, RIdx, RIdx)] {
        &self.binary_prods
    }

    /// The rules with a terminal production for token `tidx`.
    ///
    /// # Panics
    ///
    /// If `tidx` doesn't exist.
    pub fn term_prods_for(&self, tidx: TIdx) -> &[RIdx] {
        &self.term_prods_by_token[usize::from(tidx)]
    }
}

/// Intern a fresh rule named `base`, disambiguating with a numeric suffix if
/// the name is taken.
fn fresh_rule(rule_names: &mut IndexSet<String>, base: &str) -> RIdx {
    if !rule_names.contains(base) {
        let (i, _) = rule_names.insert_full(base.to_owned());
        return RIdx::from_usize(i);
    }
    let mut n = 0;
    loop {
        let cand = format!("{}.{}", base, n);
        if !rule_names.contains(&cand) {
            let (i, _) = rule_names.insert_full(cand);
            return RIdx::from_usize(i);
        }
        n += 1;
    }
}

/// Replace every production of every rule `A` with the non-unit productions
/// of every rule reachable from `A` through unit productions.
fn eliminate_unit_prods(cfg: &Cfg) -> Vec<(RIdx, Vec<Symbol>)> {
    let rules_len = usize::from(cfg.rules_len());
    let mut unit_adj = vec![Vec::new(); rules_len];
    for ridx in cfg.iter_ridxs() {
        for &pidx in cfg.rule_to_prods(ridx) {
            if let [Symbol::Rule(b)] = cfg.prod(pidx)[..] {
                unit_adj[usize::from(ridx)].push(b);
            }
        }
    }

    let mut prods = Vec::new();
    let mut seen = FnvHashSet::default();
    for ridx in cfg.iter_ridxs() {
        // All rules unit-reachable from `ridx`, itself included.
        let mut reach = Vob::from_elem(false, rules_len);
        reach.set(usize::from(ridx), true);
        let mut todo = vec![ridx];
        while let Some(b) = todo.pop() {
            for &c in &unit_adj[usize::from(b)] {
                if !reach[usize::from(c)] {
                    reach.set(usize::from(c), true);
                    todo.push(c);
                }
            }
        }
        for b in reach.iter_set_bits(..) {
            for &pidx in cfg.rule_to_prods(RIdx::from_usize(b)) {
                let body = cfg.prod(pidx);
                if let [Symbol::Rule(_)] = body[..] {
                    continue;
                }
                if seen.insert((ridx, body.to_vec())) {
                    prods.push((ridx, body.to_vec()));
                }
            }
        }
    }
    prods
}

/// Drop productions mentioning non-generating rules, then productions of
/// rules unreachable from the start rule.
fn remove_useless(cfg: &Cfg, prods: &mut Vec<(RIdx, Vec<Symbol>)>) {
    let rules_len = usize::from(cfg.rules_len());

    let mut generating = Vob::from_elem(false, rules_len);
    // Loop looking for newly generating rules until we reach a fixed point.
    loop {
        let mut changed = false;
        for (lhs, body) in prods.iter() {
            if !generating[usize::from(*lhs)]
                && body.iter().all(|sym| match *sym {
                    Symbol::Token(_) => true,
                    Symbol::Rule(r) => generating[usize::from(r)],
                })
            {
                generating.set(usize::from(*lhs), true);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    prods.retain(|(_, body)| {
        body.iter().all(|sym| match *sym {
            Symbol::Token(_) => true,
            Symbol::Rule(r) => generating[usize::from(r)],
        })
    });

    let mut reachable = Vob::from_elem(false, rules_len);
    reachable.set(usize::from(cfg.start_rule()), true);
    let mut todo = vec![cfg.start_rule()];
    while let Some(ridx) = todo.pop() {
        for (lhs, body) in prods.iter() {
            if *lhs != ridx {
                continue;
            }
            for sym in body {
                if let Symbol::Rule(r) = *sym {
                    if !reachable[usize::from(r)] {
                        reachable.set(usize::from(r), true);
                        todo.push(r);
                    }
                }
            }
        }
    }
    prods.retain(|(lhs, _)| reachable[usize::from(*lhs)]);
}
