//! Operator tags.

use std::fmt;
use std::str::FromStr;

use crate::error::CanonError;

/// Kind of a linear operator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpTag {
    // ========== Leaves ==========
    /// A decision variable.
    Variable,
    /// A scalar constant.
    ScalarConst,
    /// A dense matrix constant.
    DenseConst,
    /// A sparse matrix constant.
    SparseConst,

    // ========== Elementwise / arithmetic ==========
    /// Elementwise sum of equally shaped arguments.
    Sum,
    /// Negation.
    Neg,
    /// Left multiplication by a constant: A @ x.
    Mul,
    /// Right multiplication by a constant: x @ B.
    Rmul,
    /// Elementwise multiplication by a constant.
    MulElem,
    /// Elementwise division by a constant.
    Div,

    // ========== Structural ==========
    /// Row/column slicing.
    Index,
    /// Transpose.
    Transpose,
    /// Reshape (column-major order preserved).
    Reshape,
    /// Vertical concatenation.
    Vstack,
    /// Horizontal concatenation.
    Hstack,
    /// Broadcast a scalar to the declared shape.
    Promote,

    // ========== Reductions and matrix structure ==========
    /// Sum of all entries.
    SumEntries,
    /// Matrix trace.
    Trace,
    /// Vector to diagonal matrix.
    DiagVec,
    /// Diagonal of a matrix as a vector.
    DiagMat,
    /// Strictly upper triangular entries as a vector.
    UpperTri,
    /// 1-D convolution with a constant kernel.
    Conv,
    /// Kronecker product with a constant on the left.
    Kron,
    /// Contributes nothing.
    NoOp,
}

impl OpTag {
    /// All tags, in declaration order.
    pub const ALL: [OpTag; 24] = [
        OpTag::Variable,
        OpTag::ScalarConst,
        OpTag::DenseConst,
        OpTag::SparseConst,
        OpTag::Sum,
        OpTag::Neg,
        OpTag::Mul,
        OpTag::Rmul,
        OpTag::MulElem,
        OpTag::Div,
        OpTag::Index,
        OpTag::Transpose,
        OpTag::Reshape,
        OpTag::Vstack,
        OpTag::Hstack,
        OpTag::Promote,
        OpTag::SumEntries,
        OpTag::Trace,
        OpTag::DiagVec,
        OpTag::DiagMat,
        OpTag::UpperTri,
        OpTag::Conv,
        OpTag::Kron,
        OpTag::NoOp,
    ];

    /// Canonical upper-case name of the tag.
    pub fn name(&self) -> &'static str {
        match self {
            OpTag::Variable => "VARIABLE",
            OpTag::ScalarConst => "SCALAR_CONST",
            OpTag::DenseConst => "DENSE_CONST",
            OpTag::SparseConst => "SPARSE_CONST",
            OpTag::Sum => "SUM",
            OpTag::Neg => "NEG",
            OpTag::Mul => "MUL",
            OpTag::Rmul => "RMUL",
            OpTag::MulElem => "MUL_ELEM",
            OpTag::Div => "DIV",
            OpTag::Index => "INDEX",
            OpTag::Transpose => "TRANSPOSE",
            OpTag::Reshape => "RESHAPE",
            OpTag::Vstack => "VSTACK",
            OpTag::Hstack => "HSTACK",
            OpTag::Promote => "PROMOTE",
            OpTag::SumEntries => "SUM_ENTRIES",
            OpTag::Trace => "TRACE",
            OpTag::DiagVec => "DIAG_VEC",
            OpTag::DiagMat => "DIAG_MAT",
            OpTag::UpperTri => "UPPER_TRI",
            OpTag::Conv => "CONV",
            OpTag::Kron => "KRON",
            OpTag::NoOp => "NO_OP",
        }
    }

    /// Check if this tag is a constant leaf.
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            OpTag::ScalarConst | OpTag::DenseConst | OpTag::SparseConst
        )
    }

    /// Check if this tag takes a constant operand in its payload.
    pub fn takes_operand(&self) -> bool {
        matches!(
            self,
            OpTag::Mul | OpTag::Rmul | OpTag::MulElem | OpTag::Div | OpTag::Conv | OpTag::Kron
        )
    }
}

impl fmt::Display for OpTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OpTag {
    type Err = CanonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // SLICE is accepted as an alias of INDEX
        if s == "SLICE" {
            return Ok(OpTag::Index);
        }
        OpTag::ALL
            .iter()
            .find(|tag| tag.name() == s)
            .copied()
            .ok_or_else(|| CanonError::UnsupportedOperator(s.to_string()))
    }
}
