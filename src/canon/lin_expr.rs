//! Linear expression representation used while lowering trees.
//!
//! Every node lowers to the standard form `sum_i(A_i * x_i) + b`, where the
//! output is flattened in column-major order.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;

use crate::linop::{Shape, VarId};
use crate::sparse::{csc_add, csc_identity, csc_matmul, csc_mul_vec, csc_scale};

/// A linear expression in standard form: sum_i(A_i * x_i) + b
///
/// Each term is a sparse coefficient matrix multiplied by a variable.
/// The constant term `b` is a dense vector.
#[derive(Debug, Clone)]
pub struct LinExpr {
    /// Coefficient matrices for each variable: var_id -> coefficient matrix.
    /// The coefficient matrix A_i has shape (output_size, var_size).
    pub coeffs: HashMap<VarId, CscMatrix<f64>>,
    /// Constant term, flattened column-major (length output_size).
    pub constant: DVector<f64>,
    /// Output shape of this expression.
    pub shape: Shape,
}

impl LinExpr {
    /// Create a zero linear expression with the given shape.
    pub fn zeros(shape: Shape) -> Self {
        LinExpr {
            coeffs: HashMap::new(),
            constant: DVector::zeros(shape.size()),
            shape,
        }
    }

    /// Create a linear expression for a single variable (identity coefficient).
    pub fn variable(var_id: VarId, shape: Shape) -> Self {
        let mut coeffs = HashMap::new();
        coeffs.insert(var_id, csc_identity(shape.size()));
        LinExpr {
            coeffs,
            constant: DVector::zeros(shape.size()),
            shape,
        }
    }

    /// Create a constant linear expression.
    pub fn constant(value: &DMatrix<f64>) -> Self {
        let shape = Shape::matrix(value.nrows(), value.ncols());
        LinExpr {
            coeffs: HashMap::new(),
            constant: DVector::from_iterator(shape.size(), value.iter().copied()),
            shape,
        }
    }

    /// Check if this is a constant (no variables).
    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Get the output size (flattened).
    pub fn size(&self) -> usize {
        self.shape.size()
    }

    /// Constant term reshaped to the expression's shape.
    pub fn constant_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.shape.rows(), self.shape.cols(), self.constant.as_slice())
    }

    /// Add two linear expressions of the same size.
    pub fn add(&self, other: &LinExpr) -> LinExpr {
        // Optimization: if self has no coefficients, just clone other's
        let coeffs = if self.coeffs.is_empty() {
            other.coeffs.clone()
        } else if other.coeffs.is_empty() {
            self.coeffs.clone()
        } else {
            let mut coeffs = self.coeffs.clone();
            coeffs.reserve(other.coeffs.len());
            for (var_id, coeff) in &other.coeffs {
                coeffs
                    .entry(*var_id)
                    .and_modify(|c| *c = csc_add(c, coeff))
                    .or_insert_with(|| coeff.clone());
            }
            coeffs
        };

        LinExpr {
            coeffs,
            constant: &self.constant + &other.constant,
            shape: self.shape,
        }
    }

    /// Negate a linear expression.
    pub fn neg(&self) -> LinExpr {
        self.scale(-1.0)
    }

    /// Scale by a scalar.
    pub fn scale(&self, scalar: f64) -> LinExpr {
        let coeffs = self
            .coeffs
            .iter()
            .map(|(k, v)| (*k, csc_scale(v, scalar)))
            .collect();
        LinExpr {
            coeffs,
            constant: &self.constant * scalar,
            shape: self.shape,
        }
    }

    /// Apply a linear map `t` (out_size x size) to the flattened output.
    ///
    /// Every coefficient block becomes `t * A_i` and the constant `t * b`.
    pub fn transform(&self, t: &CscMatrix<f64>, shape: Shape) -> LinExpr {
        debug_assert_eq!(t.ncols(), self.size());
        debug_assert_eq!(t.nrows(), shape.size());
        let coeffs = self
            .coeffs
            .iter()
            .map(|(k, v)| (*k, csc_matmul(t, v)))
            .collect();
        LinExpr {
            coeffs,
            constant: csc_mul_vec(t, &self.constant),
            shape,
        }
    }

    /// Same linear map viewed under a different shape of equal size.
    pub fn with_shape(mut self, shape: Shape) -> LinExpr {
        debug_assert_eq!(shape.size(), self.size());
        self.shape = shape;
        self
    }

    /// Total stored entries across all coefficient blocks.
    pub fn nnz(&self) -> usize {
        self.coeffs.values().map(|c| c.nnz()).sum()
    }

    /// Get all variable IDs in this expression.
    pub fn variables(&self) -> Vec<VarId> {
        let mut vars: Vec<_> = self.coeffs.keys().copied().collect();
        vars.sort();
        vars
    }
}
