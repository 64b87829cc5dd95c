//! Problem data assembly and the canonicalization entry points.
//!
//! A forest of root expressions is lowered root by root and stuffed into a
//! single sparse matrix `A` and constant vector `b`, so that the stacked
//! value of all roots equals `A*x + b`:
//! ```
//! use cvxcanon::prelude::*;
//!
//! let x = variable(0, 1);
//! let roots = vec![sum(vec![x.clone(), scalar(5.0)])];
//! let ids = IdToCol::from_pairs([(VarId::new(0), 0)]).unwrap();
//!
//! let data = build_without_offsets(&roots, &ids).unwrap();
//! assert_eq!(data.triplets(), vec![(0, 0, 1.0)]);
//! assert_eq!(data.b, vec![5.0]);
//! ```

use std::sync::Arc;
use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;
use tracing::debug;

use crate::canon::Evaluator;
use crate::error::{CanonError, Result};
use crate::linop::LinOp;
use crate::matrix::{BuildSettings, IdToCol, RowOffsets, Stuffing};
use crate::sparse::{csc_mul_vec, csc_to_dense};

/// Canonicalized problem data: the forest evaluates to `A*x + b`.
#[derive(Debug, Clone)]
pub struct ProblemData {
    /// Coefficient matrix, duplicates summed and zeros dropped.
    pub a: CscMatrix<f64>,
    /// Constant vector with one entry per row of `a`.
    pub b: Vec<f64>,
}

impl Default for ProblemData {
    fn default() -> Self {
        ProblemData {
            a: CscMatrix::zeros(0, 0),
            b: Vec::new(),
        }
    }
}

impl ProblemData {
    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.a.nrows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.a.ncols()
    }

    /// Number of stored entries in `A`.
    pub fn nnz(&self) -> usize {
        self.a.nnz()
    }

    /// Entries of `A` as (row, col, value), column-major.
    pub fn triplets(&self) -> Vec<(usize, usize, f64)> {
        self.a.triplet_iter().map(|(r, c, v)| (r, c, *v)).collect()
    }

    /// Dense copy of `A`.
    pub fn to_dense(&self) -> DMatrix<f64> {
        csc_to_dense(&self.a)
    }

    /// Compute `A*x + b`.
    pub fn eval(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.cols() {
            return Err(CanonError::LengthMismatch {
                what: "variable values",
                expected: self.cols(),
                got: x.len(),
            });
        }
        let ax = csc_mul_vec(&self.a, &DVector::from_column_slice(x));
        Ok(ax.iter().zip(&self.b).map(|(a, b)| a + b).collect())
    }
}

/// Lowers forests of linear operator trees into [`ProblemData`].
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    settings: BuildSettings,
}

impl Canonicalizer {
    /// Create a canonicalizer with the given settings.
    pub fn new(settings: BuildSettings) -> Self {
        Canonicalizer { settings }
    }

    /// Settings used by this canonicalizer.
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Stack the roots contiguously from row 0 in forest order.
    pub fn build_without_offsets(
        &self,
        roots: &[Arc<LinOp>],
        id_to_col: &IdToCol,
    ) -> Result<ProblemData> {
        self.build(roots, id_to_col, &RowOffsets::contiguous(roots))
    }

    /// Place root `i` starting at row `constr_offsets[i]`.
    pub fn build_with_offsets(
        &self,
        roots: &[Arc<LinOp>],
        id_to_col: &IdToCol,
        constr_offsets: &[usize],
    ) -> Result<ProblemData> {
        if constr_offsets.len() > roots.len() {
            return Err(CanonError::LengthMismatch {
                what: "row offsets",
                expected: roots.len(),
                got: constr_offsets.len(),
            });
        }
        self.build(roots, id_to_col, &RowOffsets::explicit(constr_offsets))
    }

    fn build(
        &self,
        roots: &[Arc<LinOp>],
        id_to_col: &IdToCol,
        offsets: &RowOffsets,
    ) -> Result<ProblemData> {
        let start = Instant::now();
        let mut evaluator = Evaluator::new(id_to_col, &self.settings);
        let mut stuffing = Stuffing::new();

        for (i, root) in roots.iter().enumerate() {
            let row_offset = offsets.resolve_row(i)?;
            let lowered = evaluator.evaluate(i, root)?;
            stuffing.stuff(&lowered, id_to_col, i, row_offset)?;
            debug!(
                component = "canon",
                operation = "build",
                expr = i,
                op = root.op().name(),
                rows = lowered.size(),
                row_offset,
                nnz = lowered.nnz(),
                "Lowered root expression"
            );
        }

        let widths = evaluator.widths();
        if self.settings.check_column_overlap {
            id_to_col.validate_ranges(widths)?;
        }
        let ncols = id_to_col.column_count(widths);
        let data = stuffing.finish(ncols, self.settings.zero_tol);

        debug!(
            component = "canon",
            operation = "build",
            status = "success",
            mode = offsets.mode().as_str(),
            roots = roots.len(),
            rows = data.rows(),
            cols = data.cols(),
            nnz = data.nnz(),
            cache_hits = evaluator.cache_hits(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Built problem data"
        );
        Ok(data)
    }
}

/// Canonicalize with default settings, stacking roots contiguously.
pub fn build_without_offsets(roots: &[Arc<LinOp>], id_to_col: &IdToCol) -> Result<ProblemData> {
    Canonicalizer::default().build_without_offsets(roots, id_to_col)
}

/// Canonicalize with default settings at caller-supplied row offsets.
pub fn build_with_offsets(
    roots: &[Arc<LinOp>],
    id_to_col: &IdToCol,
    constr_offsets: &[usize],
) -> Result<ProblemData> {
    Canonicalizer::default().build_with_offsets(roots, id_to_col, constr_offsets)
}
