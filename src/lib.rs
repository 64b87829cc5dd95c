//! # cvxcanon
//!
//! Canonicalization of linear operator trees into sparse problem data.
//!
//! A modeling layer describes every affine expression of an optimization
//! problem as a tree of [`LinOp`](linop::LinOp) nodes. cvxcanon lowers a
//! forest of such trees into one sparse matrix `A` and one dense vector `b`
//! such that stacking the value of every root gives `A*x + b`, where `x` is
//! the concatenation of all variables.
//!
//! ## Quick Start
//!
//! ```
//! use cvxcanon::prelude::*;
//!
//! // x is a 2-vector at column 0
//! let x = variable(0, 2);
//! let ids = IdToCol::from_pairs([(VarId::new(0), 0)]).unwrap();
//!
//! // Two constraint rows: 3*x and -x
//! let roots = vec![mul(scalar(3.0), x.clone()), neg(x)];
//!
//! let data = build_without_offsets(&roots, &ids).unwrap();
//! assert_eq!(data.rows(), 4);
//! assert_eq!(data.cols(), 2);
//! assert_eq!(data.eval(&[1.0, 2.0]).unwrap(), vec![3.0, 6.0, -1.0, -2.0]);
//! ```
//!
//! ## Supported Operators
//!
//! - Leaves: `VARIABLE`, `SCALAR_CONST`, `DENSE_CONST`, `SPARSE_CONST`
//! - Arithmetic: `SUM`, `NEG`, `MUL`, `RMUL`, `MUL_ELEM`, `DIV`
//! - Structural: `INDEX`, `TRANSPOSE`, `RESHAPE`, `VSTACK`, `HSTACK`, `PROMOTE`
//! - Matrix structure: `SUM_ENTRIES`, `TRACE`, `DIAG_VEC`, `DIAG_MAT`,
//!   `UPPER_TRI`, `CONV`, `KRON`, `NO_OP`
//!
//! ## Architecture
//!
//! - **Expression trees** built from `LinOp` nodes with `Arc` sharing
//! - **Lowering** maps each node to per-variable sparse coefficient blocks
//!   plus a constant, memoized by node identity
//! - **Matrix stuffing** shifts each root by its row offset and each variable
//!   by its first column, then sums duplicates into CSC form

pub mod canon;
pub mod error;
pub mod linop;
pub mod matrix;
pub mod problem;
pub mod sparse;

/// Prelude module for convenient imports.
///
/// ```
/// use cvxcanon::prelude::*;
/// ```
pub mod prelude {
    // Expression trees
    pub use crate::linop::{
        conv, dense, dense_vec, diag_mat, diag_vec, div, hstack, index, kron, mul, mul_elem, neg,
        no_op, promote, reshape, rmul, scalar, sparse, sum, sum_entries, trace, transpose,
        upper_tri, variable, vstack, Array, LinOp, LinOpVector, OpTag, Payload, Shape, Slice,
        VarId,
    };

    // Index tables and settings
    pub use crate::matrix::{BuildSettings, IdToCol, OffsetMode, RowOffsets};

    // Entry points
    pub use crate::problem::{build_with_offsets, build_without_offsets, Canonicalizer, ProblemData};

    // Errors
    pub use crate::error::{CanonError, Result};
}

// Re-export main types at crate root
pub use error::{CanonError, Result};
pub use problem::{build_with_offsets, build_without_offsets, Canonicalizer, ProblemData};
