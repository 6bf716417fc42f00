//! A square boolean matrix with bit-packed rows.
//!
//! The boolean semiring (AND for multiplication, OR for addition) is all the
//! query engines ever need, so a row is simply a [`Vob`] and a matrix product
//! is a union of rows. Row-level bit operations keep the inner loops free of
//! per-cell branching.

use vob::Vob;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An n×n boolean matrix.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BitMatrix {
    rows: Vec<Vob>,
}

impl BitMatrix {
    /// Create a zero matrix with `size` rows and columns.
    pub fn new(size: usize) -> Self {
        BitMatrix {
            rows: vec![Vob::from_elem(false, size); size],
        }
    }

    /// How many rows (equally, columns) does this matrix have?
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Return the entry at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// If `row` or `col` is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.rows[row][col]
    }

    /// Set the entry at (`row`, `col`) to `v`.
    ///
    /// # Panics
    ///
    /// If `row` or `col` is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, v: bool) {
        self.rows[row].set(col, v);
    }

    /// Return row `row` as a bit vector over column indices.
    ///
    /// # Panics
    ///
    /// If `row` is out of bounds.
    pub fn row(&self, row: usize) -> &Vob {
        &self.rows[row]
    }

    /// Set every diagonal entry to true.
    pub fn set_diagonal(&mut self) {
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.set(i, true);
        }
    }

    /// Or `other` into this matrix, returning true if anything changed.
    ///
    /// # Panics
    ///
    /// If the two matrices differ in size.
    pub fn or(&mut self, other: &BitMatrix) -> bool {
        debug_assert_eq!(self.size(), other.size());
        let mut changed = false;
        for (row, orow) in self.rows.iter_mut().zip(other.rows.iter()) {
            if row.or(orow) {
                changed = true;
            }
        }
        changed
    }

    /// The boolean matrix product `self · other`: row `r` of the result is
    /// the union of the rows of `other` selected by the set bits of row `r`
    /// of `self`.
    ///
    /// # Panics
    ///
    /// If the two matrices differ in size.
    pub fn mul(&self, other: &BitMatrix) -> BitMatrix {
        debug_assert_eq!(self.size(), other.size());
        let mut out = BitMatrix::new(self.size());
        for (row, out_row) in self.rows.iter().zip(out.rows.iter_mut()) {
            for c in row.iter_set_bits(..) {
                out_row.or(&other.rows[c]);
            }
        }
        out
    }

    /// The Kronecker product `self ⊗ other`: entry
    /// (`i * m + k`, `j * m + l`) of the result is set iff (`i`, `j`) is set
    /// here and (`k`, `l`) is set in `other` (`m` being `other.size()`).
    pub fn kron(&self, other: &BitMatrix) -> BitMatrix {
        let m = other.size();
        let mut out = BitMatrix::new(self.size() * m);
        for (i, row) in self.rows.iter().enumerate() {
            for j in row.iter_set_bits(..) {
                for (k, orow) in other.rows.iter().enumerate() {
                    let out_row = &mut out.rows[i * m + k];
                    for l in orow.iter_set_bits(..) {
                        out_row.set(j * m + l, true);
                    }
                }
            }
        }
        out
    }

    /// How many entries are set?
    pub fn count_ones(&self) -> usize {
        self.rows.iter().map(|r| r.iter_set_bits(..).count()).sum()
    }

    /// Return an iterator over the (`row`, `col`) coordinates of all set
    /// entries, in row-major order.
    pub fn iter_set(&self) -> impl Iterator<Item = (usize, usize)> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter_set_bits(..).map(move |c| (r, c)))
    }

    /// Pretty print this matrix as a `String`, one row per line, with `1`
    /// for a set entry and `.` for a clear one.
    pub fn pp(&self) -> String {
        let mut o = String::new();
        for row in &self.rows {
            for i in 0..row.len() {
                o.push(if row[i] { '1' } else { '.' });
            }
            o.push('\n');
        }
        o
    }
}
