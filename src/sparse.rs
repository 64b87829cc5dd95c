//! Sparse matrix utilities.
//!
//! Helper functions for working with nalgebra-sparse matrices.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together. Entries outside the matrix are skipped.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> CscMatrix<f64> {
    if rows.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    // Build COO matrix first
    let mut coo = CooMatrix::new(nrows, ncols);
    for ((row, col), val) in rows.into_iter().zip(cols).zip(vals) {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }

    // Convert to CSC
    CscMatrix::from(&coo)
}

/// Create a CSC matrix from an iterator of (row, col, value) entries.
pub fn csc_from_entries(
    nrows: usize,
    ncols: usize,
    entries: impl IntoIterator<Item = (usize, usize, f64)>,
) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();
    for (r, c, v) in entries {
        rows.push(r);
        cols.push(c);
        vals.push(v);
    }
    csc_from_triplets(nrows, ncols, rows, cols, vals)
}

/// Create a CSC identity matrix.
pub fn csc_identity(n: usize) -> CscMatrix<f64> {
    CscMatrix::identity(n)
}

/// Create a square diagonal matrix.
pub fn csc_diag(values: &[f64]) -> CscMatrix<f64> {
    let n = values.len();
    csc_from_entries(n, n, values.iter().enumerate().map(|(i, v)| (i, i, *v)))
}

/// Create a matrix of ones.
pub fn csc_ones(nrows: usize, ncols: usize) -> CscMatrix<f64> {
    csc_from_entries(
        nrows,
        ncols,
        (0..ncols).flat_map(|j| (0..nrows).map(move |i| (i, j, 1.0))),
    )
}

/// Convert a dense matrix to CSC format.
pub fn dense_to_csc(dense: &DMatrix<f64>) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();

    for j in 0..dense.ncols() {
        for i in 0..dense.nrows() {
            let v = dense[(i, j)];
            if v != 0.0 {
                rows.push(i);
                cols.push(j);
                vals.push(v);
            }
        }
    }

    csc_from_triplets(dense.nrows(), dense.ncols(), rows, cols, vals)
}

/// Convert CSC to dense matrix.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] += *val;
    }
    dense
}

/// Add two CSC matrices of the same shape.
pub fn csc_add(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let entries = a
        .triplet_iter()
        .chain(b.triplet_iter())
        .map(|(r, c, v)| (r, c, *v));
    csc_from_entries(a.nrows(), a.ncols(), entries)
}

/// Scale a CSC matrix.
pub fn csc_scale(a: &CscMatrix<f64>, scalar: f64) -> CscMatrix<f64> {
    let mut scaled = a.clone();
    for v in scaled.values_mut() {
        *v *= scalar;
    }
    scaled
}

/// Sparse product `a * b`.
pub fn csc_matmul(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    a * b
}

/// Sparse matrix times dense vector.
pub fn csc_mul_vec(a: &CscMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let mut out = DVector::zeros(a.nrows());
    for (r, c, v) in a.triplet_iter() {
        out[r] += *v * x[c];
    }
    out
}

/// Kronecker product `a ⊗ b`.
pub fn csc_kron(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let (bm, bn) = (b.nrows(), b.ncols());
    let entries = a.triplet_iter().flat_map(move |(i, j, v)| {
        b.triplet_iter()
            .map(move |(k, l, w)| (i * bm + k, j * bn + l, *v * *w))
    });
    csc_from_entries(a.nrows() * bm, a.ncols() * bn, entries)
}

/// Drop entries with magnitude at most `tol`.
pub fn csc_prune(a: &CscMatrix<f64>, tol: f64) -> CscMatrix<f64> {
    let entries = a
        .triplet_iter()
        .filter(|(_, _, v)| v.abs() > tol)
        .map(|(r, c, v)| (r, c, *v));
    csc_from_entries(a.nrows(), a.ncols(), entries)
}
