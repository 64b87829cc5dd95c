//! Shared helpers for integration tests.
//!
//! `eval_direct` computes the value of a tree straight from dense matrices,
//! without going through canonicalization, so `A*x + b` can be checked
//! against it.

#![allow(dead_code)]

use std::collections::HashMap;

use cvxcanon::prelude::*;
use nalgebra::{DMatrix, DVector};

/// Tolerance for comparing floating point results
pub const TOL: f64 = 1e-9;

/// Variable values keyed by id, each stored in its declared shape.
pub type Values = HashMap<VarId, DMatrix<f64>>;

/// Evaluate a tree directly.
pub fn eval_direct(node: &LinOp, values: &Values) -> DMatrix<f64> {
    let shape = node.shape();
    let arg = |k: usize| eval_direct(&node.args()[k], values);
    let operand = || match node.payload() {
        Payload::Operand(data) => eval_direct(data, values),
        other => panic!("expected operand, got {:?}", other),
    };

    match node.op() {
        OpTag::Variable => {
            let id = node.variable_id().expect("variable id");
            let v = &values[&id];
            DMatrix::from_column_slice(shape.rows(), shape.cols(), v.as_slice())
        }
        OpTag::ScalarConst | OpTag::DenseConst | OpTag::SparseConst => match node.payload() {
            Payload::Value(value) => value.to_dense(),
            other => panic!("expected value, got {:?}", other),
        },
        OpTag::Sum => {
            let mut total = DMatrix::zeros(shape.rows(), shape.cols());
            for k in 0..node.args().len() {
                total += arg(k);
            }
            total
        }
        OpTag::Neg => -arg(0),
        OpTag::Mul => {
            let a = operand();
            let x = arg(0);
            if a.len() == 1 {
                x * a[(0, 0)]
            } else {
                a * x
            }
        }
        OpTag::Rmul => {
            let b = operand();
            let x = arg(0);
            if b.len() == 1 {
                x * b[(0, 0)]
            } else {
                x * b
            }
        }
        OpTag::MulElem => {
            let c = operand();
            let x = arg(0);
            if c.len() == 1 {
                x * c[(0, 0)]
            } else {
                x.component_mul(&c)
            }
        }
        OpTag::Div => {
            let c = operand();
            let x = arg(0);
            if c.len() == 1 {
                x / c[(0, 0)]
            } else {
                x.component_div(&c)
            }
        }
        OpTag::Index => {
            let (rows, cols) = match node.payload() {
                Payload::Index(rows, cols) => (rows.indices(), cols.indices()),
                other => panic!("expected slices, got {:?}", other),
            };
            let x = arg(0);
            DMatrix::from_fn(rows.len(), cols.len(), |i, j| {
                x[(rows[i] as usize, cols[j] as usize)]
            })
        }
        OpTag::Transpose => arg(0).transpose(),
        OpTag::Reshape => {
            let x = arg(0);
            DMatrix::from_column_slice(shape.rows(), shape.cols(), x.as_slice())
        }
        OpTag::Vstack => {
            let parts: Vec<_> = (0..node.args().len()).map(arg).collect();
            let mut out = DMatrix::zeros(shape.rows(), shape.cols());
            let mut row = 0;
            for p in parts {
                out.view_mut((row, 0), (p.nrows(), p.ncols())).copy_from(&p);
                row += p.nrows();
            }
            out
        }
        OpTag::Hstack => {
            let parts: Vec<_> = (0..node.args().len()).map(arg).collect();
            let mut out = DMatrix::zeros(shape.rows(), shape.cols());
            let mut col = 0;
            for p in parts {
                out.view_mut((0, col), (p.nrows(), p.ncols())).copy_from(&p);
                col += p.ncols();
            }
            out
        }
        OpTag::Promote => DMatrix::from_element(shape.rows(), shape.cols(), arg(0)[(0, 0)]),
        OpTag::SumEntries => DMatrix::from_element(1, 1, arg(0).sum()),
        OpTag::Trace => DMatrix::from_element(1, 1, arg(0).trace()),
        OpTag::DiagVec => {
            let x = arg(0);
            DMatrix::from_diagonal(&DVector::from_column_slice(x.as_slice()))
        }
        OpTag::DiagMat => {
            let d = arg(0).diagonal();
            DMatrix::from_column_slice(d.len(), 1, d.as_slice())
        }
        OpTag::UpperTri => {
            let x = arg(0);
            let n = x.nrows();
            let mut entries = Vec::new();
            for i in 0..n {
                for j in (i + 1)..n {
                    entries.push(x[(i, j)]);
                }
            }
            DMatrix::from_vec(entries.len(), 1, entries)
        }
        OpTag::Conv => {
            let c = operand();
            let x = arg(0);
            let mut out = DMatrix::zeros(shape.rows(), 1);
            for (i, ci) in c.iter().enumerate() {
                for (j, xj) in x.iter().enumerate() {
                    out[(i + j, 0)] += ci * xj;
                }
            }
            out
        }
        OpTag::Kron => operand().kronecker(&arg(0)),
        OpTag::NoOp => DMatrix::zeros(shape.rows(), shape.cols()),
    }
}

/// Stack the direct values of every root at the given row offsets.
pub fn stack_direct(roots: &[std::sync::Arc<LinOp>], offsets: &[usize], values: &Values) -> Vec<f64> {
    let rows = roots
        .iter()
        .zip(offsets)
        .map(|(r, off)| off + r.shape().size())
        .max()
        .unwrap_or(0);
    let mut out = vec![0.0; rows];
    for (root, &off) in roots.iter().zip(offsets) {
        for (k, v) in eval_direct(root, values).iter().enumerate() {
            out[off + k] += v;
        }
    }
    out
}

/// Concatenate variable values into the column vector `x`.
pub fn pack_values(ids: &IdToCol, values: &Values, ncols: usize) -> Vec<f64> {
    let mut x = vec![0.0; ncols];
    for (id, col) in ids.iter() {
        if let Some(v) = values.get(&id) {
            for (k, val) in v.iter().enumerate() {
                if col + k < ncols {
                    x[col + k] = *val;
                }
            }
        }
    }
    x
}

/// Assert two vectors agree within `TOL`.
pub fn assert_close(got: &[f64], expected: &[f64], context: &str) {
    assert_eq!(got.len(), expected.len(), "{}: length differs", context);
    for (i, (g, e)) in got.iter().zip(expected).enumerate() {
        assert!(
            (g - e).abs() < TOL,
            "{}: entry {} is {}, expected {}",
            context,
            i,
            g,
            e
        );
    }
}
