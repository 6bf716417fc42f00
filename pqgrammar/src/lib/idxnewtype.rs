// This macro generates a struct which exposes a u32 API. Grammars and graphs
// big enough to overflow a u32 index are far beyond what the query engines can
// process in reasonable time, so we don't pay for a wider representation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

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
    /// A type specifically for rule indices.
    ///
    /// It is guaranteed that `RIdx` can be converted, without loss of
    /// precision, to `usize` with `usize::from(x_ridx)`.
    RIdx
);
IdxNewtype!(
    /// A type specifically for production indices (e.g. a rule `E: A | B`
    /// would have two productions for the single rule `E`).
    PIdx
);
IdxNewtype!(
    /// A type specifically for token indices.
    TIdx
);
IdxNewtype!(
    /// A type specifically for box-local state indices within a recursive
    /// state machine.
    BIdx
);
