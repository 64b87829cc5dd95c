//! Stacked Constraints Example
//!
//! This example canonicalizes the affine parts of a small problem:
//!
//! A x - b          (2 rows, equality block)
//! x - 1            (3 rows, bound block)
//! sum(x) + t - 10  (1 row)
//!
//! and prints the resulting sparse matrix and constant vector.

use cvxcanon::prelude::*;
use nalgebra::DMatrix;

fn main() -> Result<()> {
    println!("=== Stacked Constraints ===\n");

    // x in R^3 at column 0, t scalar at column 3
    let x = variable(0, 3);
    let t = variable(1, 1);
    let ids = IdToCol::from_pairs([(VarId::new(0), 0), (VarId::new(1), 3)])?;

    let a = DMatrix::from_row_slice(2, 3, &[2.0, 1.0, 3.0, 1.0, 2.0, 1.0]);
    let roots = vec![
        sum(vec![mul(dense(a), x.clone()), neg(dense_vec(vec![100.0, 80.0]))]),
        sum(vec![x.clone(), promote(scalar(-1.0), 3)]),
        sum(vec![sum_entries(x), t, scalar(-10.0)]),
    ];

    let data = build_without_offsets(&roots, &ids)?;
    println!("A is {}x{} with {} nonzeros", data.rows(), data.cols(), data.nnz());
    println!("A = {}", data.to_dense());
    println!("b = {:?}\n", data.b);

    // Place the bound block first instead
    let reordered = build_with_offsets(&roots, &ids, &[3, 0, 5])?;
    println!("Reordered b = {:?}", reordered.b);

    let point = [1.0, 2.0, 3.0, 4.0];
    println!("A*x + b at {:?} = {:?}", point, data.eval(&point)?);
    Ok(())
}
