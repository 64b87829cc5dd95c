//! Convenience constructors for linear operator trees.
//!
//! Each function returns an `Arc<LinOp>` ready to be shared between parents.
//! Declared shapes are inferred from the inputs where the rule is obvious;
//! nothing is validated here, the evaluator checks shapes while lowering.

use std::sync::Arc;

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use super::node::{Array, LinOp, Payload, Slice, VarId};
use super::op::OpTag;
use super::shape::Shape;

fn node(op: OpTag, shape: Shape, args: Vec<Arc<LinOp>>, payload: Payload) -> Arc<LinOp> {
    Arc::new(LinOp::new(op, shape, args, payload))
}

/// Create a variable with the given id and shape.
///
/// # Examples
///
/// ```
/// use cvxcanon::linop::{variable, Shape};
///
/// let x = variable(0, 3);
/// assert_eq!(x.shape(), Shape::vector(3));
/// ```
pub fn variable(id: u64, shape: impl Into<Shape>) -> Arc<LinOp> {
    node(
        OpTag::Variable,
        shape.into(),
        vec![],
        Payload::Variable(VarId::new(id)),
    )
}

/// Create a scalar constant.
pub fn scalar(value: f64) -> Arc<LinOp> {
    node(
        OpTag::ScalarConst,
        Shape::scalar(),
        vec![],
        Payload::Value(Array::Scalar(value)),
    )
}

/// Create a dense constant from a nalgebra DMatrix.
pub fn dense(matrix: DMatrix<f64>) -> Arc<LinOp> {
    let shape = Shape::matrix(matrix.nrows(), matrix.ncols());
    node(
        OpTag::DenseConst,
        shape,
        vec![],
        Payload::Value(Array::Dense(matrix)),
    )
}

/// Create a dense column-vector constant.
pub fn dense_vec(values: Vec<f64>) -> Arc<LinOp> {
    dense(DMatrix::from_vec(values.len(), 1, values))
}

/// Create a sparse constant from a CSC matrix.
pub fn sparse(matrix: CscMatrix<f64>) -> Arc<LinOp> {
    let shape = Shape::matrix(matrix.nrows(), matrix.ncols());
    node(
        OpTag::SparseConst,
        shape,
        vec![],
        Payload::Value(Array::Sparse(matrix)),
    )
}

/// Elementwise sum. The shape is taken from the first argument.
pub fn sum(args: Vec<Arc<LinOp>>) -> Arc<LinOp> {
    let shape = args.first().map(|a| a.shape()).unwrap_or_default();
    node(OpTag::Sum, shape, args, Payload::None)
}

/// Negation.
pub fn neg(arg: Arc<LinOp>) -> Arc<LinOp> {
    let shape = arg.shape();
    node(OpTag::Neg, shape, vec![arg], Payload::None)
}

/// Left multiplication `lhs @ arg` by a constant subtree.
pub fn mul(lhs: Arc<LinOp>, arg: Arc<LinOp>) -> Arc<LinOp> {
    let shape = if lhs.shape().is_scalar() {
        arg.shape()
    } else {
        Shape::matrix(lhs.shape().rows(), arg.shape().cols())
    };
    node(OpTag::Mul, shape, vec![arg], Payload::Operand(lhs))
}

/// Right multiplication `arg @ rhs` by a constant subtree.
pub fn rmul(arg: Arc<LinOp>, rhs: Arc<LinOp>) -> Arc<LinOp> {
    let shape = if rhs.shape().is_scalar() {
        arg.shape()
    } else {
        Shape::matrix(arg.shape().rows(), rhs.shape().cols())
    };
    node(OpTag::Rmul, shape, vec![arg], Payload::Operand(rhs))
}

/// Elementwise multiplication by a constant subtree.
pub fn mul_elem(coeff: Arc<LinOp>, arg: Arc<LinOp>) -> Arc<LinOp> {
    let shape = arg.shape();
    node(OpTag::MulElem, shape, vec![arg], Payload::Operand(coeff))
}

/// Elementwise division by a constant subtree.
pub fn div(arg: Arc<LinOp>, divisor: Arc<LinOp>) -> Arc<LinOp> {
    let shape = arg.shape();
    node(OpTag::Div, shape, vec![arg], Payload::Operand(divisor))
}

/// Select `arg[rows, cols]`.
pub fn index(arg: Arc<LinOp>, rows: Slice, cols: Slice) -> Arc<LinOp> {
    let shape = Shape::matrix(rows.len(), cols.len());
    node(OpTag::Index, shape, vec![arg], Payload::Index(rows, cols))
}

/// Transpose.
pub fn transpose(arg: Arc<LinOp>) -> Arc<LinOp> {
    let shape = arg.shape().transpose();
    node(OpTag::Transpose, shape, vec![arg], Payload::None)
}

/// Reshape to `shape` in column-major order.
pub fn reshape(arg: Arc<LinOp>, shape: impl Into<Shape>) -> Arc<LinOp> {
    node(OpTag::Reshape, shape.into(), vec![arg], Payload::None)
}

/// Vertical stack: [a; b; ...]
pub fn vstack(args: Vec<Arc<LinOp>>) -> Arc<LinOp> {
    let rows = args.iter().map(|a| a.shape().rows()).sum();
    let cols = args.first().map(|a| a.shape().cols()).unwrap_or(0);
    node(OpTag::Vstack, Shape::matrix(rows, cols), args, Payload::None)
}

/// Horizontal stack: [a, b, ...]
pub fn hstack(args: Vec<Arc<LinOp>>) -> Arc<LinOp> {
    let rows = args.first().map(|a| a.shape().rows()).unwrap_or(0);
    let cols = args.iter().map(|a| a.shape().cols()).sum();
    node(OpTag::Hstack, Shape::matrix(rows, cols), args, Payload::None)
}

/// Broadcast a scalar expression to `shape`.
pub fn promote(arg: Arc<LinOp>, shape: impl Into<Shape>) -> Arc<LinOp> {
    node(OpTag::Promote, shape.into(), vec![arg], Payload::None)
}

/// Sum of all entries.
pub fn sum_entries(arg: Arc<LinOp>) -> Arc<LinOp> {
    node(OpTag::SumEntries, Shape::scalar(), vec![arg], Payload::None)
}

/// Matrix trace.
pub fn trace(arg: Arc<LinOp>) -> Arc<LinOp> {
    node(OpTag::Trace, Shape::scalar(), vec![arg], Payload::None)
}

/// Diagonal matrix from a vector.
pub fn diag_vec(arg: Arc<LinOp>) -> Arc<LinOp> {
    let n = arg.shape().size();
    node(OpTag::DiagVec, Shape::matrix(n, n), vec![arg], Payload::None)
}

/// Diagonal of a square matrix as a column vector.
pub fn diag_mat(arg: Arc<LinOp>) -> Arc<LinOp> {
    let n = arg.shape().rows();
    node(OpTag::DiagMat, Shape::vector(n), vec![arg], Payload::None)
}

/// Strictly upper triangular entries of a square matrix as a column vector.
pub fn upper_tri(arg: Arc<LinOp>) -> Arc<LinOp> {
    let n = arg.shape().rows();
    let len = n * n.saturating_sub(1) / 2;
    node(OpTag::UpperTri, Shape::vector(len), vec![arg], Payload::None)
}

/// Full 1-D convolution of a constant kernel with a vector expression.
pub fn conv(kernel: Arc<LinOp>, arg: Arc<LinOp>) -> Arc<LinOp> {
    let len = (kernel.shape().size() + arg.shape().size()).saturating_sub(1);
    node(OpTag::Conv, Shape::vector(len), vec![arg], Payload::Operand(kernel))
}

/// Kronecker product `lhs ⊗ arg` with a constant left factor.
pub fn kron(lhs: Arc<LinOp>, arg: Arc<LinOp>) -> Arc<LinOp> {
    let (l, r) = (lhs.shape(), arg.shape());
    let shape = Shape::matrix(l.rows() * r.rows(), l.cols() * r.cols());
    node(OpTag::Kron, shape, vec![arg], Payload::Operand(lhs))
}

/// A node contributing nothing, of the given shape.
pub fn no_op(shape: impl Into<Shape>) -> Arc<LinOp> {
    node(OpTag::NoOp, shape.into(), vec![], Payload::None)
}
