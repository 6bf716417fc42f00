#![allow(clippy::new_without_default)]
#![allow(clippy::upper_case_acronyms)]
#![forbid(unsafe_code)]

//! `pqgrammar` provides the grammar side of path querying: a context-free
//! grammar representation built programmatically (parsing grammar text is a
//! job for upstream tooling), a transformation into weak Chomsky normal form,
//! and a recursive state machine (RSM) view where every rule owns a small
//! automaton "box" whose rule-labeled edges represent calls.
//!
//! Terminology follows the usual conventions:
//!
//!   * A *grammar* is an ordered sequence of *productions*.
//!   * A *production* is an ordered sequence of *symbols*.
//!   * A *rule* maps a name to one or more productions.
//!   * A *token* is the name of a syntactic element found on graph edges.
//!
//! The following guarantees hold for every grammar:
//!
//!   * Productions are numbered from `0` to `prods_len() - 1` (inclusive).
//!   * Rules are numbered from `0` to `rules_len() - 1` (inclusive).
//!   * Tokens are numbered from `0` to `tokens_len() - 1` (inclusive).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod idxnewtype;

pub mod cfg;
pub mod rsm;
pub mod weaknf;

pub use crate::cfg::{Cfg, CfgBuilder};
pub use crate::idxnewtype::{BIdx, PIdx, RIdx, TIdx};
pub use crate::rsm::{Rsm, RsmBox, RsmError};
pub use crate::weaknf::WeakNf;

/// A grammar symbol: either a rule (nonterminal) or a token (terminal).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Symbol {
    Rule(RIdx),
    Token(TIdx),
}
