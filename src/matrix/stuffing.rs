//! Matrix stuffing: places lowered expressions into the global `A` and `b`.
//!
//! Each root's [`LinExpr`] lives in local coordinates (row `r` of its own
//! flattened output, column `c` of one variable). Stuffing shifts rows by the
//! root's offset and columns by the variable's first column, then collects the
//! triplets. Entries hitting the same (row, col) are summed when the matrix is
//! finalized, never overwritten.

use nalgebra_sparse::CscMatrix;

use super::index::IdToCol;
use crate::canon::LinExpr;
use crate::error::Result;
use crate::problem::ProblemData;
use crate::sparse::{csc_from_triplets, csc_prune};

/// Accumulator for the triplet stream and constant vector.
#[derive(Debug, Default)]
pub struct Stuffing {
    a_rows: Vec<usize>,
    a_cols: Vec<usize>,
    a_vals: Vec<f64>,
    b: Vec<f64>,
}

impl Stuffing {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stuff one lowered root expression starting at `row_offset`.
    ///
    /// The LinExpr represents: expr = sum_i(A_i * x_i) + constant.
    /// Coefficients go to `A` as-is and the constant is added into `b`, so
    /// the result evaluates as `A*x + b`.
    pub fn stuff(
        &mut self,
        expr: &LinExpr,
        id_to_col: &IdToCol,
        expr_index: usize,
        row_offset: usize,
    ) -> Result<()> {
        for (var_id, coeff) in &expr.coeffs {
            let col_start = id_to_col.resolve_column(*var_id, expr_index)?;
            for (row, col, val) in coeff.triplet_iter() {
                self.a_rows.push(row_offset + row);
                self.a_cols.push(col_start + col);
                self.a_vals.push(*val);
            }
        }

        let end = row_offset + expr.size();
        if self.b.len() < end {
            self.b.resize(end, 0.0);
        }
        for (i, val) in expr.constant.iter().enumerate() {
            self.b[row_offset + i] += *val;
        }
        Ok(())
    }

    /// Rows touched so far.
    pub fn rows(&self) -> usize {
        self.b.len()
    }

    /// Number of triplets collected so far (before summing duplicates).
    pub fn triplet_count(&self) -> usize {
        self.a_vals.len()
    }

    /// Sum duplicates, drop entries with magnitude at most `zero_tol`, and
    /// produce the final problem data with `ncols` columns.
    pub fn finish(self, ncols: usize, zero_tol: f64) -> ProblemData {
        let nrows = self.b.len();
        debug_assert!(
            self.a_rows.iter().all(|&r| r < nrows),
            "stuffed row outside the {} rows of b",
            nrows
        );
        debug_assert!(
            self.a_cols.iter().all(|&c| c < ncols),
            "stuffed column outside the {} columns of A",
            ncols
        );
        let a: CscMatrix<f64> = csc_from_triplets(nrows, ncols, self.a_rows, self.a_cols, self.a_vals);
        ProblemData {
            a: csc_prune(&a, zero_tol),
            b: self.b,
        }
    }
}
