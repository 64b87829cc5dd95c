//! Canonicalization lowers linear operator trees into standard form.
//!
//! This module converts each node into a `LinExpr`: sparse coefficient
//! blocks per variable plus a constant vector, both over the node's
//! flattened output.

pub mod evaluator;
pub mod lin_expr;

pub use evaluator::Evaluator;
pub use lin_expr::LinExpr;
