#![allow(clippy::new_without_default)]
#![forbid(unsafe_code)]

//! `pqautomata` represents finite automata as data that boolean matrix
//! algebra can chew on. The input form is an [`Nfa`] (or a [`Graph`] viewed
//! as one: nodes become states, labeled edges become transitions); the
//! derived form is a [`MatrixAutomaton`], which decomposes the transition
//! relation into one bit-packed adjacency matrix per edge label. Word
//! acceptance, emptiness, Kronecker-product intersection and transitive
//! closure are all matrix operations on that decomposition.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod bitmatrix;
pub mod graph;
pub mod matrix;
pub mod nfa;

pub use crate::bitmatrix::BitMatrix;
pub use crate::graph::{Graph, InvalidNodeSetError};
pub use crate::matrix::{MatrixAutomaton, RsmStateInfo};
pub use crate::nfa::Nfa;

// This macro generates a struct which exposes a u32 API. The biggest graphs
// the engines are asked about have a few million nodes, so u32 indices are
// comfortably big enough.
macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $n(pub u32);

        impl From<$n> for usize {
            fn from(idx: $n) -> Self {
                idx.0 as usize
            }
        }

        impl From<$n> for u32 {
            fn from(idx: $n) -> Self {
                idx.0
            }
        }

        impl $n {
            /// Wrap `x`.
            ///
            /// # Panics
            ///
            /// If `x` does not fit in a `u32`.
            pub fn from_usize(x: usize) -> Self {
                match u32::try_from(x) {
                    Ok(x) => $n(x),
                    Err(_) => panic!("Overflow"),
                }
            }
        }
    }
}

IdxNewtype!(
    /// A type specifically for automaton state indices.
    StIdx
);
IdxNewtype!(
    /// A type specifically for graph node indices.
    NodeIdx
);
