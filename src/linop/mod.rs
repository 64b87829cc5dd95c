//! Linear operator trees.
//!
//! This module provides the input model for canonicalization:
//! - `LinOp` - one node of an expression tree, children shared through `Arc`
//! - `OpTag` - the operator kind of a node
//! - `Shape` - 2-D output shape
//! - Constructors such as `variable()`, `sum()` and `mul()`

pub mod constructors;
pub mod node;
pub mod op;
pub mod shape;

pub use constructors::{
    conv, dense, dense_vec, diag_mat, diag_vec, div, hstack, index, kron, mul, mul_elem, neg,
    no_op, promote, reshape, rmul, scalar, sparse, sum, sum_entries, trace, transpose, upper_tri,
    variable, vstack,
};
pub use node::{Array, LinOp, LinOpVector, Payload, Slice, VarId};
pub use op::OpTag;
pub use shape::Shape;
