//! Error types for cvxcanon.

use thiserror::Error;

use crate::linop::{OpTag, Shape, VarId};

/// Error type for canonicalization.
///
/// Every variant raised while lowering a tree carries the position of the
/// root expression in the forest (`expr`) so the offending node can be found.
#[derive(Debug, Error)]
pub enum CanonError {
    /// A VARIABLE node references an id missing from the column table.
    #[error("Unknown variable {id} in expression {expr}")]
    UnknownVariable { id: VarId, expr: usize },

    /// Operator tag not recognized.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Shapes incompatible at a combination point.
    #[error("Dimension mismatch at {op} in expression {expr}: expected {expected}, got {got}")]
    DimensionMismatch {
        op: OpTag,
        expr: usize,
        expected: Shape,
        got: Shape,
    },

    /// Expression index past the end of the row offset table.
    #[error("Expression index {index} out of range for offset table of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// An input sequence has the wrong length.
    #[error("Expected {expected} {what}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Slice selects an element outside its operand.
    #[error("Slice index {index} out of bounds for dimension {len} at {op} in expression {expr}")]
    SliceOutOfBounds {
        op: OpTag,
        expr: usize,
        index: isize,
        len: usize,
    },

    /// Payload, arity or constant operand does not fit the operator.
    #[error("Invalid operand for {op} in expression {expr}: {reason}")]
    InvalidOperand {
        op: OpTag,
        expr: usize,
        reason: String,
    },

    /// Two variables claim overlapping column ranges.
    #[error("Column ranges of variables {first} and {second} overlap")]
    OverlappingColumns { first: VarId, second: VarId },

    /// The same variable id was given two columns.
    #[error("Duplicate variable id {0}")]
    DuplicateVariable(VarId),

    /// A host-style variable name is not a non-negative integer.
    #[error("Invalid variable name: {0:?}")]
    InvalidVariableName(String),
}

/// Result type for cvxcanon operations.
pub type Result<T> = std::result::Result<T, CanonError>;
