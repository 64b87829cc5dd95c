//! Core linear operator node types.
//!
//! A `LinOp` is one node of an expression tree. Children are held through
//! `Arc`, so a subexpression may be shared by several parents (the forest is
//! really a DAG) and lives as long as its longest holder.

use std::fmt;
use std::sync::Arc;

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use super::op::OpTag;
use super::shape::Shape;
use crate::sparse::csc_to_dense;

/// Identifier of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u64);

impl VarId {
    /// Wrap a raw identifier.
    pub fn new(raw: u64) -> Self {
        VarId(raw)
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VarId {
    fn from(raw: u64) -> Self {
        VarId(raw)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric payload of a constant leaf (dense, sparse or scalar).
#[derive(Debug, Clone)]
pub enum Array {
    /// Dense matrix storage.
    Dense(DMatrix<f64>),
    /// Sparse CSC matrix storage.
    Sparse(CscMatrix<f64>),
    /// Scalar value.
    Scalar(f64),
}

impl Array {
    /// Get the shape of the array.
    pub fn shape(&self) -> Shape {
        match self {
            Array::Dense(m) => Shape::matrix(m.nrows(), m.ncols()),
            Array::Sparse(m) => Shape::matrix(m.nrows(), m.ncols()),
            Array::Scalar(_) => Shape::scalar(),
        }
    }

    /// Get the total number of elements.
    pub fn size(&self) -> usize {
        self.shape().size()
    }

    /// Try to get as a scalar value.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Array::Scalar(v) => Some(*v),
            Array::Dense(m) if m.nrows() == 1 && m.ncols() == 1 => Some(m[(0, 0)]),
            _ => None,
        }
    }

    /// Materialize as a dense matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        match self {
            Array::Dense(m) => m.clone(),
            Array::Sparse(s) => csc_to_dense(s),
            Array::Scalar(v) => DMatrix::from_element(1, 1, *v),
        }
    }

    /// Create from a column vector.
    pub fn from_vec(v: Vec<f64>) -> Self {
        let n = v.len();
        Array::Dense(DMatrix::from_vec(n, 1, v))
    }
}

impl From<f64> for Array {
    fn from(v: f64) -> Self {
        Array::Scalar(v)
    }
}

impl From<Vec<f64>> for Array {
    fn from(v: Vec<f64>) -> Self {
        Array::from_vec(v)
    }
}

impl From<DMatrix<f64>> for Array {
    fn from(m: DMatrix<f64>) -> Self {
        Array::Dense(m)
    }
}

impl From<CscMatrix<f64>> for Array {
    fn from(m: CscMatrix<f64>) -> Self {
        Array::Sparse(m)
    }
}

/// Half-open slice `start..stop` walked with `step` along one dimension.
///
/// `step` may be negative, in which case the walk goes downward while the
/// index stays above `stop` (so `stop = -1` reaches index 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start: isize,
    pub stop: isize,
    pub step: isize,
}

impl Slice {
    /// Create a slice with an explicit step.
    pub fn new(start: isize, stop: isize, step: isize) -> Self {
        Slice { start, stop, step }
    }

    /// Unit-step slice `start..stop`. Bounds past `isize::MAX` saturate.
    pub fn range(start: usize, stop: usize) -> Self {
        let clamp = |n: usize| isize::try_from(n).unwrap_or(isize::MAX);
        Slice::new(clamp(start), clamp(stop), 1)
    }

    /// Single element `i`.
    pub fn element(i: usize) -> Self {
        Slice::range(i, i.saturating_add(1))
    }

    /// Entire dimension of length `n`.
    pub fn all(n: usize) -> Self {
        Slice::range(0, n)
    }

    /// Lazily walk the visited indices, in order. Stops early if the next
    /// index would overflow `isize`.
    pub fn iter(&self) -> impl Iterator<Item = isize> {
        let Slice { start, stop, step } = *self;
        let in_range = move |i: isize| (step > 0 && i < stop) || (step < 0 && i > stop);
        let first = Some(start).filter(|&i| in_range(i));
        std::iter::successors(first, move |&i| i.checked_add(step).filter(|&n| in_range(n)))
    }

    /// Indices visited by the slice, in order. Empty when `step == 0`.
    pub fn indices(&self) -> Vec<isize> {
        self.iter().collect()
    }

    /// Number of indices visited, computed without walking the slice.
    pub fn len(&self) -> usize {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let count = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / -step + 1
        } else {
            0
        };
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Check if the slice visits nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Operator-specific data attached to a node.
#[derive(Debug, Clone)]
pub enum Payload {
    /// No payload.
    None,
    /// Identifier of a VARIABLE node.
    Variable(VarId),
    /// Value of a constant leaf.
    Value(Array),
    /// Constant operand of MUL, RMUL, MUL_ELEM, DIV, CONV and KRON.
    Operand(Arc<LinOp>),
    /// Row and column slices of an INDEX node.
    Index(Slice, Slice),
}

/// A linear operator node.
#[derive(Debug, Clone)]
pub struct LinOp {
    /// Operator tag.
    pub op: OpTag,
    /// Declared output shape.
    pub shape: Shape,
    /// Ordered children.
    pub args: Vec<Arc<LinOp>>,
    /// Operator-specific data.
    pub payload: Payload,
}

/// Ordered forest of root expressions.
pub type LinOpVector = Vec<Arc<LinOp>>;

impl LinOp {
    /// Create a node from its parts.
    pub fn new(op: OpTag, shape: impl Into<Shape>, args: Vec<Arc<LinOp>>, payload: Payload) -> Self {
        LinOp {
            op,
            shape: shape.into(),
            args,
            payload,
        }
    }

    /// Operator tag.
    pub fn op(&self) -> OpTag {
        self.op
    }

    /// Declared output shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Ordered children.
    pub fn args(&self) -> &[Arc<LinOp>] {
        &self.args
    }

    /// Operator-specific data.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Get the variable ID if this is a VARIABLE node.
    pub fn variable_id(&self) -> Option<VarId> {
        match (&self.op, &self.payload) {
            (OpTag::Variable, Payload::Variable(id)) => Some(*id),
            _ => None,
        }
    }

    /// Check if this node is a constant leaf.
    pub fn is_constant_leaf(&self) -> bool {
        self.op.is_constant()
    }

    /// Constant operand, for tags that carry one.
    pub fn operand(&self) -> Option<&Arc<LinOp>> {
        match &self.payload {
            Payload::Operand(data) => Some(data),
            _ => None,
        }
    }

    /// Collect every variable id reachable from this node, sorted.
    pub fn variables(&self) -> Vec<VarId> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<VarId>) {
        if let Some(id) = self.variable_id() {
            vars.push(id);
        }
        for arg in &self.args {
            arg.collect_variables(vars);
        }
    }
}
