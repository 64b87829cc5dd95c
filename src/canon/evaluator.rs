//! Matrix-building evaluator.
//!
//! Lowers a linear operator tree into a [`LinExpr`] by post-order recursion.
//! Most operators are a fixed linear map on the flattened (column-major)
//! output of their argument; those are expressed as a sparse matrix `T`
//! applied to every coefficient block and to the constant term.
//!
//! Shared subexpressions are cached by node identity for the lifetime of the
//! evaluator, so a node reachable from several parents (or several roots) is
//! lowered once. Every lowered tree stays borrowed for that lifetime, so a
//! cached address can never be reused by another node. Nodes with a single
//! owner are not cached.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;
use tracing::trace;

use super::lin_expr::LinExpr;
use crate::error::{CanonError, Result};
use crate::linop::{LinOp, OpTag, Payload, Shape, Slice, VarId};
use crate::matrix::{BuildSettings, IdToCol};
use crate::sparse::{csc_diag, csc_from_entries, csc_identity, csc_kron, csc_ones, dense_to_csc};

/// Recursive lowering pass over one forest.
pub struct Evaluator<'a> {
    id_to_col: &'a IdToCol,
    settings: &'a BuildSettings,
    cache: HashMap<*const LinOp, LinExpr>,
    widths: BTreeMap<VarId, usize>,
    expr: usize,
    cache_hits: usize,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator resolving variables through `id_to_col`.
    pub fn new(id_to_col: &'a IdToCol, settings: &'a BuildSettings) -> Self {
        Evaluator {
            id_to_col,
            settings,
            cache: HashMap::new(),
            widths: BTreeMap::new(),
            expr: 0,
            cache_hits: 0,
        }
    }

    /// Lower the root at position `expr` of the forest.
    ///
    /// The root stays borrowed for the evaluator's lifetime, so results cached
    /// while lowering it remain valid for later roots.
    pub fn evaluate(&mut self, expr: usize, root: &'a Arc<LinOp>) -> Result<LinExpr> {
        self.expr = expr;
        self.lower(root)
    }

    /// Width of every variable seen so far.
    pub fn widths(&self) -> &BTreeMap<VarId, usize> {
        &self.widths
    }

    /// Number of lowerings answered from the cache.
    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    fn lower(&mut self, node: &'a Arc<LinOp>) -> Result<LinExpr> {
        let key = Arc::as_ptr(node);
        let shared = self.settings.memoize && Arc::strong_count(node) > 1;
        if shared {
            if let Some(hit) = self.cache.get(&key) {
                self.cache_hits += 1;
                trace!(
                    component = "canon",
                    operation = "lower",
                    op = node.op.name(),
                    expr = self.expr,
                    "Reused cached subexpression"
                );
                return Ok(hit.clone());
            }
        }

        let lowered = self.lower_node(node)?;
        if shared {
            self.cache.insert(key, lowered.clone());
        }
        Ok(lowered)
    }

    fn lower_node(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        match node.op {
            // Leaves
            OpTag::Variable => self.lower_variable(node),
            OpTag::ScalarConst | OpTag::DenseConst | OpTag::SparseConst => {
                self.lower_constant(node)
            }

            // Arithmetic
            OpTag::Sum => self.lower_sum(node),
            OpTag::Neg => {
                let x = self.single_arg(node)?;
                self.check_shape(node, x.shape)?;
                Ok(x.neg())
            }
            OpTag::Mul => self.lower_mul(node),
            OpTag::Rmul => self.lower_rmul(node),
            OpTag::MulElem => self.lower_mul_elem(node),
            OpTag::Div => self.lower_div(node),

            // Structural
            OpTag::Index => self.lower_index(node),
            OpTag::Transpose => self.lower_transpose(node),
            OpTag::Reshape => {
                let x = self.single_arg(node)?;
                if x.size() != node.shape.size() {
                    return Err(self.mismatch(node, node.shape, x.shape));
                }
                Ok(x.with_shape(node.shape))
            }
            OpTag::Vstack => self.lower_vstack(node),
            OpTag::Hstack => self.lower_hstack(node),
            OpTag::Promote => {
                let x = self.single_arg(node)?;
                if x.size() != 1 {
                    return Err(self.mismatch(node, Shape::scalar(), x.shape));
                }
                Ok(x.transform(&csc_ones(node.shape.size(), 1), node.shape))
            }

            // Reductions and matrix structure
            OpTag::SumEntries => {
                let x = self.single_arg(node)?;
                self.check_shape(node, Shape::scalar())?;
                Ok(x.transform(&csc_ones(1, x.size()), Shape::scalar()))
            }
            OpTag::Trace => self.lower_trace(node),
            OpTag::DiagVec => self.lower_diag_vec(node),
            OpTag::DiagMat => self.lower_diag_mat(node),
            OpTag::UpperTri => self.lower_upper_tri(node),
            OpTag::Conv => self.lower_conv(node),
            OpTag::Kron => self.lower_kron(node),
            OpTag::NoOp => Ok(LinExpr::zeros(node.shape)),
        }
    }

    // ------------------------------------------------------------------
    // Errors and argument helpers
    // ------------------------------------------------------------------

    fn mismatch(&self, node: &LinOp, expected: Shape, got: Shape) -> CanonError {
        CanonError::DimensionMismatch {
            op: node.op,
            expr: self.expr,
            expected,
            got,
        }
    }

    fn invalid(&self, node: &LinOp, reason: impl Into<String>) -> CanonError {
        CanonError::InvalidOperand {
            op: node.op,
            expr: self.expr,
            reason: reason.into(),
        }
    }

    /// Fail unless the declared shape equals the computed one.
    fn check_shape(&self, node: &LinOp, computed: Shape) -> Result<()> {
        if node.shape != computed {
            return Err(self.mismatch(node, computed, node.shape));
        }
        Ok(())
    }

    fn single_arg(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        match node.args.as_slice() {
            [arg] => self.lower(arg),
            args => Err(self.invalid(node, format!("expected 1 argument, got {}", args.len()))),
        }
    }

    fn all_args(&mut self, node: &'a LinOp) -> Result<Vec<LinExpr>> {
        if node.args.is_empty() {
            return Err(self.invalid(node, "expected at least 1 argument, got 0"));
        }
        node.args.iter().map(|arg| self.lower(arg)).collect()
    }

    /// Lower the constant operand carried in the payload.
    fn operand(&mut self, node: &'a LinOp) -> Result<DMatrix<f64>> {
        let data = match &node.payload {
            Payload::Operand(data) => data,
            _ => return Err(self.invalid(node, "missing constant operand")),
        };
        let lowered = self.lower(data)?;
        if !lowered.is_constant() {
            return Err(self.invalid(node, "operand depends on variables"));
        }
        Ok(lowered.constant_matrix())
    }

    // ------------------------------------------------------------------
    // Leaves
    // ------------------------------------------------------------------

    fn lower_variable(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let id = match &node.payload {
            Payload::Variable(id) => *id,
            _ => return Err(self.invalid(node, "variable without an id")),
        };
        if !node.args.is_empty() {
            return Err(self.invalid(node, "variables take no arguments"));
        }
        self.id_to_col.resolve_column(id, self.expr)?;

        let width = node.shape.size();
        if let Some(&seen) = self.widths.get(&id) {
            if seen != width {
                return Err(self.mismatch(node, Shape::vector(seen), node.shape));
            }
        } else {
            self.widths.insert(id, width);
        }
        Ok(LinExpr::variable(id, node.shape))
    }

    fn lower_constant(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let value = match &node.payload {
            Payload::Value(value) => value,
            _ => return Err(self.invalid(node, "constant without a value")),
        };
        if node.op == OpTag::ScalarConst && value.as_scalar().is_none() {
            return Err(self.mismatch(node, Shape::scalar(), value.shape()));
        }
        self.check_shape(node, value.shape())?;
        Ok(LinExpr::constant(&value.to_dense()))
    }

    // ------------------------------------------------------------------
    // Arithmetic
    // ------------------------------------------------------------------

    fn lower_sum(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let args = self.all_args(node)?;
        let mut total = LinExpr::zeros(node.shape);
        for arg in &args {
            if arg.shape != node.shape {
                return Err(self.mismatch(node, node.shape, arg.shape));
            }
            total = total.add(arg);
        }
        Ok(total)
    }

    fn lower_mul(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let a = self.operand(node)?;
        let x = self.single_arg(node)?;
        if a.nrows() == 1 && a.ncols() == 1 {
            self.check_shape(node, x.shape)?;
            return Ok(x.scale(a[(0, 0)]));
        }
        if a.ncols() != x.shape.rows() {
            return Err(self.mismatch(node, Shape::matrix(a.ncols(), x.shape.cols()), x.shape));
        }
        let out = Shape::matrix(a.nrows(), x.shape.cols());
        self.check_shape(node, out)?;

        // vec(A @ X) = (I_n ⊗ A) @ vec(X)
        let t = csc_kron(&csc_identity(x.shape.cols()), &dense_to_csc(&a));
        Ok(x.transform(&t, out))
    }

    fn lower_rmul(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let b = self.operand(node)?;
        let x = self.single_arg(node)?;
        if b.nrows() == 1 && b.ncols() == 1 {
            self.check_shape(node, x.shape)?;
            return Ok(x.scale(b[(0, 0)]));
        }
        if x.shape.cols() != b.nrows() {
            return Err(self.mismatch(node, Shape::matrix(x.shape.rows(), b.nrows()), x.shape));
        }
        let out = Shape::matrix(x.shape.rows(), b.ncols());
        self.check_shape(node, out)?;

        // vec(X @ B) = (B' ⊗ I_m) @ vec(X)
        let t = csc_kron(&dense_to_csc(&b.transpose()), &csc_identity(x.shape.rows()));
        Ok(x.transform(&t, out))
    }

    fn lower_mul_elem(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let c = self.operand(node)?;
        let x = self.single_arg(node)?;
        self.check_shape(node, x.shape)?;
        if c.nrows() == 1 && c.ncols() == 1 {
            return Ok(x.scale(c[(0, 0)]));
        }
        let c_shape = Shape::matrix(c.nrows(), c.ncols());
        if c_shape != x.shape {
            return Err(self.mismatch(node, x.shape, c_shape));
        }
        Ok(x.transform(&csc_diag(c.as_slice()), x.shape))
    }

    fn lower_div(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let c = self.operand(node)?;
        let x = self.single_arg(node)?;
        self.check_shape(node, x.shape)?;
        if c.iter().any(|v| *v == 0.0) {
            return Err(self.invalid(node, "division by zero"));
        }
        if c.nrows() == 1 && c.ncols() == 1 {
            return Ok(x.scale(1.0 / c[(0, 0)]));
        }
        let c_shape = Shape::matrix(c.nrows(), c.ncols());
        if c_shape != x.shape {
            return Err(self.mismatch(node, x.shape, c_shape));
        }
        let inv: Vec<f64> = c.iter().map(|v| 1.0 / v).collect();
        Ok(x.transform(&csc_diag(&inv), x.shape))
    }

    // ------------------------------------------------------------------
    // Structural
    // ------------------------------------------------------------------

    /// Resolve a slice against a dimension of length `len`, failing at the
    /// first index outside it.
    fn slice_indices(&self, node: &LinOp, slice: &Slice, len: usize) -> Result<Vec<usize>> {
        slice
            .iter()
            .map(|i| match usize::try_from(i) {
                Ok(i) if i < len => Ok(i),
                _ => Err(CanonError::SliceOutOfBounds {
                    op: node.op,
                    expr: self.expr,
                    index: i,
                    len,
                }),
            })
            .collect()
    }

    fn lower_index(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let (row_slice, col_slice) = match &node.payload {
            Payload::Index(rows, cols) => (*rows, *cols),
            _ => return Err(self.invalid(node, "index without slices")),
        };
        let x = self.single_arg(node)?;
        let rows = self.slice_indices(node, &row_slice, x.shape.rows())?;
        let cols = self.slice_indices(node, &col_slice, x.shape.cols())?;
        let out = Shape::matrix(rows.len(), cols.len());
        self.check_shape(node, out)?;

        // Selection matrix S[out_idx, in_idx] = 1
        let mut entries = Vec::with_capacity(out.size());
        for (jj, &j) in cols.iter().enumerate() {
            for (ii, &i) in rows.iter().enumerate() {
                entries.push((out.flat_index(ii, jj), x.shape.flat_index(i, j), 1.0));
            }
        }
        let s = csc_from_entries(out.size(), x.size(), entries);
        Ok(x.transform(&s, out))
    }

    fn lower_transpose(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let x = self.single_arg(node)?;
        let out = x.shape.transpose();
        self.check_shape(node, out)?;

        // Entry (i, j) moves to (j, i)
        let (m, n) = (x.shape.rows(), x.shape.cols());
        let entries = (0..n).flat_map(|j| (0..m).map(move |i| (j + i * n, i + j * m, 1.0)));
        let perm = csc_from_entries(out.size(), x.size(), entries);
        Ok(x.transform(&perm, out))
    }

    fn lower_vstack(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let args = self.all_args(node)?;
        let cols = args[0].shape.cols();
        for arg in &args {
            if arg.shape.cols() != cols {
                return Err(self.mismatch(node, Shape::matrix(arg.shape.rows(), cols), arg.shape));
            }
        }
        let total_rows = args.iter().map(|a| a.shape.rows()).sum();
        let out = Shape::matrix(total_rows, cols);
        self.check_shape(node, out)?;

        let mut stacked = LinExpr::zeros(out);
        let mut row_offset = 0;
        for arg in &args {
            let m = arg.shape.rows();
            let entries = (0..cols).flat_map(|j| {
                (0..m).map(move |i| (out.flat_index(row_offset + i, j), i + j * m, 1.0))
            });
            let place = csc_from_entries(out.size(), arg.size(), entries);
            stacked = stacked.add(&arg.transform(&place, out));
            row_offset += m;
        }
        Ok(stacked)
    }

    fn lower_hstack(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let args = self.all_args(node)?;
        let rows = args[0].shape.rows();
        for arg in &args {
            if arg.shape.rows() != rows {
                return Err(self.mismatch(node, Shape::matrix(rows, arg.shape.cols()), arg.shape));
            }
        }
        let total_cols = args.iter().map(|a| a.shape.cols()).sum();
        let out = Shape::matrix(rows, total_cols);
        self.check_shape(node, out)?;

        // Column-major: each child is a contiguous block of the output
        let mut stacked = LinExpr::zeros(out);
        let mut flat_offset = 0;
        for arg in &args {
            let entries = (0..arg.size()).map(|k| (flat_offset + k, k, 1.0));
            let place = csc_from_entries(out.size(), arg.size(), entries);
            stacked = stacked.add(&arg.transform(&place, out));
            flat_offset += arg.size();
        }
        Ok(stacked)
    }

    // ------------------------------------------------------------------
    // Reductions and matrix structure
    // ------------------------------------------------------------------

    fn square_arg(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let x = self.single_arg(node)?;
        if !x.shape.is_square() {
            let n = x.shape.rows();
            return Err(self.mismatch(node, Shape::matrix(n, n), x.shape));
        }
        Ok(x)
    }

    fn lower_trace(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let x = self.square_arg(node)?;
        self.check_shape(node, Shape::scalar())?;
        let n = x.shape.rows();
        let t = csc_from_entries(1, x.size(), (0..n).map(|i| (0, i + i * n, 1.0)));
        Ok(x.transform(&t, Shape::scalar()))
    }

    fn lower_diag_vec(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let x = self.single_arg(node)?;
        if !x.shape.is_vector() {
            return Err(self.mismatch(node, Shape::vector(x.size()), x.shape));
        }
        let n = x.size();
        let out = Shape::matrix(n, n);
        self.check_shape(node, out)?;
        let t = csc_from_entries(out.size(), n, (0..n).map(|i| (i + i * n, i, 1.0)));
        Ok(x.transform(&t, out))
    }

    fn lower_diag_mat(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let x = self.square_arg(node)?;
        let n = x.shape.rows();
        let out = Shape::vector(n);
        self.check_shape(node, out)?;
        let t = csc_from_entries(n, x.size(), (0..n).map(|i| (i, i + i * n, 1.0)));
        Ok(x.transform(&t, out))
    }

    fn lower_upper_tri(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let x = self.square_arg(node)?;
        let n = x.shape.rows();
        let out = Shape::vector(n * n.saturating_sub(1) / 2);
        self.check_shape(node, out)?;

        // Row-major walk over the strictly upper triangle
        let entries = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| i + j * n))
            .enumerate()
            .map(|(k, flat)| (k, flat, 1.0));
        let t = csc_from_entries(out.size(), x.size(), entries);
        Ok(x.transform(&t, out))
    }

    fn lower_conv(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let kernel = self.operand(node)?;
        let x = self.single_arg(node)?;
        let kernel_shape = Shape::matrix(kernel.nrows(), kernel.ncols());
        if !kernel_shape.is_vector() {
            return Err(self.invalid(node, format!("kernel must be a vector, got {}", kernel_shape)));
        }
        if !x.shape.is_vector() {
            return Err(self.mismatch(node, Shape::vector(x.size()), x.shape));
        }
        let (k, n) = (kernel.len(), x.size());
        let out = Shape::vector((k + n).saturating_sub(1));
        self.check_shape(node, out)?;

        // Toeplitz: y[i + j] += c[i] * x[j]
        let entries = (0..n).flat_map(|j| kernel.iter().enumerate().map(move |(i, c)| (i + j, j, *c)));
        let t = csc_from_entries(out.size(), n, entries);
        Ok(x.transform(&t, out))
    }

    fn lower_kron(&mut self, node: &'a LinOp) -> Result<LinExpr> {
        let c = self.operand(node)?;
        let x = self.single_arg(node)?;
        let (p, q) = (c.nrows(), c.ncols());
        let (m, n) = (x.shape.rows(), x.shape.cols());
        let out = Shape::matrix(p * m, q * n);
        self.check_shape(node, out)?;

        // (C ⊗ X)[i*m + k, j*n + l] = C[i, j] * X[k, l]
        let mut entries = Vec::new();
        for j in 0..q {
            for i in 0..p {
                let cij = c[(i, j)];
                if cij == 0.0 {
                    continue;
                }
                for l in 0..n {
                    for k in 0..m {
                        entries.push((out.flat_index(i * m + k, j * n + l), k + l * m, cij));
                    }
                }
            }
        }
        let t: CscMatrix<f64> = csc_from_entries(out.size(), x.size(), entries);
        Ok(x.transform(&t, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linop::{dense, dense_vec, index, neg, scalar, sum, variable, vstack};
    use crate::sparse::csc_to_dense;

    fn columns(pairs: &[(u64, usize)]) -> IdToCol {
        IdToCol::from_pairs(pairs.iter().map(|&(id, col)| (VarId::new(id), col))).unwrap()
    }

    #[test]
    fn test_lower_variable() {
        let ids = columns(&[(0, 0)]);
        let settings = BuildSettings::default();
        let x = variable(0, 3);
        let mut ev = Evaluator::new(&ids, &settings);
        let lowered = ev.evaluate(0, &x).unwrap();
        assert_eq!(lowered.variables(), vec![VarId::new(0)]);
        assert_eq!(ev.widths()[&VarId::new(0)], 3);
    }

    #[test]
    fn test_unknown_variable_is_not_a_constant() {
        let ids = columns(&[(0, 0)]);
        let settings = BuildSettings::default();
        let root = sum(vec![variable(9, 1), scalar(1.0)]);
        let mut ev = Evaluator::new(&ids, &settings);
        let err = ev.evaluate(2, &root).unwrap_err();
        assert!(matches!(err, CanonError::UnknownVariable { expr: 2, .. }));
    }

    #[test]
    fn test_shared_node_is_cached() {
        let ids = columns(&[(0, 0)]);
        let settings = BuildSettings::default();
        let shared = neg(variable(0, 2));
        let root = sum(vec![shared.clone(), shared.clone(), shared]);
        let mut ev = Evaluator::new(&ids, &settings);
        let lowered = ev.evaluate(0, &root).unwrap();
        assert_eq!(ev.cache_hits(), 2);
        assert_eq!(ev.cache.len(), 1);
        let coeff = csc_to_dense(&lowered.coeffs[&VarId::new(0)]);
        assert_eq!(coeff, DMatrix::identity(2, 2) * -3.0);
    }

    #[test]
    fn test_single_owner_nodes_are_not_cached() {
        let ids = columns(&[(0, 0)]);
        let settings = BuildSettings::default();
        let root = neg(neg(vstack(vec![variable(0, 2), dense_vec(vec![1.0])])));
        let mut ev = Evaluator::new(&ids, &settings);
        ev.evaluate(0, &root).unwrap();
        assert!(ev.cache.is_empty());
        assert_eq!(ev.cache_hits(), 0);
    }

    #[test]
    fn test_evaluator_reused_across_roots() {
        let ids = columns(&[(0, 0)]);
        let settings = BuildSettings::default();
        let shared = neg(variable(0, 1));
        let mut forest = Vec::new();
        for i in 0..10 {
            forest.push(if i % 2 == 0 { variable(0, 1) } else { scalar(5.0) });
            forest.push(shared.clone());
        }

        let mut ev = Evaluator::new(&ids, &settings);
        for (i, root) in forest.iter().enumerate() {
            let lowered = ev.evaluate(i, root).unwrap();
            match root.op() {
                OpTag::Variable => {
                    assert_eq!(csc_to_dense(&lowered.coeffs[&VarId::new(0)])[(0, 0)], 1.0);
                    assert_eq!(lowered.constant[0], 0.0);
                }
                OpTag::ScalarConst => {
                    assert!(lowered.is_constant(), "root {} lowered as a variable", i);
                    assert_eq!(lowered.constant[0], 5.0);
                }
                OpTag::Neg => {
                    assert_eq!(csc_to_dense(&lowered.coeffs[&VarId::new(0)])[(0, 0)], -1.0);
                }
                other => panic!("unexpected root {:?}", other),
            }
        }
        assert_eq!(ev.cache_hits(), 9);
        assert_eq!(ev.cache.len(), 1);
    }

    #[test]
    fn test_cache_disabled() {
        let ids = columns(&[(0, 0)]);
        let settings = BuildSettings {
            memoize: false,
            ..BuildSettings::default()
        };
        let x = variable(0, 1);
        let root = sum(vec![x.clone(), x]);
        let mut ev = Evaluator::new(&ids, &settings);
        ev.evaluate(0, &root).unwrap();
        assert_eq!(ev.cache_hits(), 0);
        assert!(ev.cache.is_empty());
    }

    #[test]
    fn test_sum_shape_mismatch() {
        let ids = columns(&[(0, 0)]);
        let settings = BuildSettings::default();
        let root = sum(vec![variable(0, 2), dense_vec(vec![1.0, 2.0, 3.0])]);
        let mut ev = Evaluator::new(&ids, &settings);
        let err = ev.evaluate(1, &root).unwrap_err();
        assert!(matches!(
            err,
            CanonError::DimensionMismatch { op: OpTag::Sum, expr: 1, .. }
        ));
    }

    #[test]
    fn test_variable_width_must_be_consistent() {
        let ids = columns(&[(0, 0)]);
        let settings = BuildSettings::default();
        let root = vstack(vec![variable(0, 2), variable(0, 3)]);
        let mut ev = Evaluator::new(&ids, &settings);
        let err = ev.evaluate(0, &root).unwrap_err();
        assert!(matches!(
            err,
            CanonError::DimensionMismatch { op: OpTag::Variable, .. }
        ));
    }

    #[test]
    fn test_operand_must_be_constant() {
        let ids = columns(&[(0, 0), (1, 2)]);
        let settings = BuildSettings::default();
        let root = crate::linop::mul(variable(1, 1), variable(0, 2));
        let mut ev = Evaluator::new(&ids, &settings);
        let err = ev.evaluate(0, &root).unwrap_err();
        assert!(matches!(err, CanonError::InvalidOperand { op: OpTag::Mul, .. }));
    }

    #[test]
    fn test_mul_dense_operand() {
        let ids = columns(&[(0, 0)]);
        let settings = BuildSettings::default();
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let root = crate::linop::mul(dense(a.clone()), variable(0, 2));
        let mut ev = Evaluator::new(&ids, &settings);
        let lowered = ev.evaluate(0, &root).unwrap();
        assert_eq!(csc_to_dense(&lowered.coeffs[&VarId::new(0)]), a);
    }

    #[test]
    fn test_extreme_slice_bounds_fail_cleanly() {
        let ids = columns(&[(0, 0)]);
        let settings = BuildSettings::default();
        let cases = [
            (Slice::new(0, isize::MAX, isize::MAX / 2 + 1), isize::MAX / 2 + 1),
            (Slice::new(0, isize::MAX, 1), 2),
            (Slice::new(-1, 2, 1), -1),
            (Slice::new(isize::MAX, isize::MIN, isize::MIN), isize::MAX),
        ];
        for (rows, bad) in cases {
            let root = index(variable(0, 2), rows, Slice::all(1));
            let mut ev = Evaluator::new(&ids, &settings);
            let err = ev.evaluate(0, &root).unwrap_err();
            assert!(
                matches!(err, CanonError::SliceOutOfBounds { index, len: 2, .. } if index == bad),
                "{:?} gave {:?}",
                rows,
                err
            );
        }
    }
}
