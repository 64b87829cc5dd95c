//! Property tests for canonicalization (linearity, negation, offsets)

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{assert_close, pack_values, stack_direct, Values, TOL};
use cvxcanon::prelude::*;
use nalgebra::DMatrix;
use proptest::collection::vec;
use proptest::prelude::*;

// ============================================================================
// Tree Generation
// ============================================================================

/// Every generated tree is a 3-vector over u (id 0) and v (id 1).
#[derive(Debug, Clone)]
enum Recipe {
    Var(u64),
    Const(Vec<f64>),
    Neg(Box<Recipe>),
    Scale(f64, Box<Recipe>),
    Sum(Box<Recipe>, Box<Recipe>),
    MulMat(Vec<f64>, Box<Recipe>),
    MulElem(Vec<f64>, Box<Recipe>),
    Reverse(Box<Recipe>),
    Spread(Box<Recipe>),
}

impl Recipe {
    fn build(&self) -> Arc<LinOp> {
        match self {
            Recipe::Var(id) => variable(*id, 3),
            Recipe::Const(values) => dense_vec(values.clone()),
            Recipe::Neg(inner) => neg(inner.build()),
            Recipe::Scale(c, inner) => mul(scalar(*c), inner.build()),
            Recipe::Sum(a, b) => sum(vec![a.build(), b.build()]),
            Recipe::MulMat(entries, inner) => {
                mul(dense(DMatrix::from_column_slice(3, 3, entries)), inner.build())
            }
            Recipe::MulElem(coeffs, inner) => mul_elem(dense_vec(coeffs.clone()), inner.build()),
            Recipe::Reverse(inner) => index(inner.build(), Slice::new(2, -1, -1), Slice::all(1)),
            Recipe::Spread(inner) => promote(sum_entries(inner.build()), 3),
        }
    }
}

fn arb_value() -> impl Strategy<Value = f64> {
    (-50i32..=50).prop_map(|n| n as f64 / 4.0)
}

fn arb_recipe() -> impl Strategy<Value = Recipe> {
    let leaf = prop_oneof![
        (0u64..2).prop_map(Recipe::Var),
        vec(arb_value(), 3).prop_map(Recipe::Const),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|r| Recipe::Neg(Box::new(r))),
            (arb_value(), inner.clone()).prop_map(|(c, r)| Recipe::Scale(c, Box::new(r))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Recipe::Sum(Box::new(a), Box::new(b))),
            (vec(arb_value(), 9), inner.clone())
                .prop_map(|(m, r)| Recipe::MulMat(m, Box::new(r))),
            (vec(arb_value(), 3), inner.clone())
                .prop_map(|(c, r)| Recipe::MulElem(c, Box::new(r))),
            inner.clone().prop_map(|r| Recipe::Reverse(Box::new(r))),
            inner.prop_map(|r| Recipe::Spread(Box::new(r))),
        ]
    })
}

fn arb_values() -> impl Strategy<Value = Values> {
    (vec(arb_value(), 3), vec(arb_value(), 3)).prop_map(|(u, v)| {
        let mut values = HashMap::new();
        values.insert(VarId::new(0), DMatrix::from_vec(3, 1, u));
        values.insert(VarId::new(1), DMatrix::from_vec(3, 1, v));
        values
    })
}

fn layout() -> IdToCol {
    IdToCol::from_pairs([(VarId::new(0), 0), (VarId::new(1), 3)]).unwrap()
}

/// Evaluate `A*x + b` with `x` padded to the full layout.
fn eval_full(data: &ProblemData, values: &Values) -> Vec<f64> {
    let x = pack_values(&layout(), values, data.cols());
    data.eval(&x).unwrap()
}

proptest! {
    /// A*x + b equals direct evaluation of the stacked roots
    #[test]
    fn canonical_form_matches_direct(
        recipes in vec(arb_recipe(), 1..4),
        values in arb_values(),
    ) {
        let roots: Vec<_> = recipes.iter().map(Recipe::build).collect();
        let data = build_without_offsets(&roots, &layout()).unwrap();

        let offsets: Vec<usize> = (0..roots.len()).map(|i| 3 * i).collect();
        let expected = stack_direct(&roots, &offsets, &values);
        let got = eval_full(&data, &values);
        prop_assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(&expected) {
            prop_assert!((g - e).abs() < TOL * (1.0 + e.abs()), "got {}, expected {}", g, e);
        }
    }

    /// build(F1 + F2) == build(F1) + build(F2)
    #[test]
    fn canonicalization_is_linear(
        f1 in arb_recipe(),
        f2 in arb_recipe(),
        values in arb_values(),
    ) {
        let ids = layout();
        let combined = build_without_offsets(&[sum(vec![f1.build(), f2.build()])], &ids).unwrap();
        let first = build_without_offsets(&[f1.build()], &ids).unwrap();
        let second = build_without_offsets(&[f2.build()], &ids).unwrap();

        for i in 0..3 {
            let b = first.b[i] + second.b[i];
            prop_assert!((combined.b[i] - b).abs() < TOL * (1.0 + b.abs()));
        }

        let y = eval_full(&combined, &values);
        let y1 = eval_full(&first, &values);
        let y2 = eval_full(&second, &values);
        for i in 0..3 {
            let e = y1[i] + y2[i];
            prop_assert!((y[i] - e).abs() < TOL * (1.0 + e.abs()), "row {}: {} vs {}", i, y[i], e);
        }
    }

    /// NEG(NEG(F)) canonicalizes to the same data as F
    #[test]
    fn double_negation_is_identity(f in arb_recipe()) {
        let ids = layout();
        let once = build_without_offsets(&[f.build()], &ids).unwrap();
        let twice = build_without_offsets(&[neg(neg(f.build()))], &ids).unwrap();

        prop_assert_eq!(once.triplets(), twice.triplets());
        prop_assert_eq!(once.b, twice.b);
    }

    /// Root i occupies rows offsets[i]..offsets[i] + 3, whatever the order or gaps
    #[test]
    fn roots_land_at_their_offsets(
        recipes in vec(arb_recipe(), 1..4),
        offsets in vec(0usize..12, 4),
        values in arb_values(),
    ) {
        let roots: Vec<_> = recipes.iter().map(Recipe::build).collect();
        let offsets = &offsets[..roots.len()];
        let data = build_with_offsets(&roots, &layout(), offsets).unwrap();

        let rows = offsets.iter().map(|o| o + 3).max().unwrap_or(0);
        prop_assert_eq!(data.rows(), rows);

        let expected = stack_direct(&roots, offsets, &values);
        let got = eval_full(&data, &values);
        prop_assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(&expected) {
            prop_assert!((g - e).abs() < TOL * (1.0 + e.abs()), "got {}, expected {}", g, e);
        }

        // Each root on its own matches its block of the combined data
        for (root, &off) in roots.iter().zip(offsets) {
            let alone = build_without_offsets(&[root.clone()], &layout()).unwrap();
            prop_assert_eq!(alone.rows(), 3);
            let shifted = build_with_offsets(&[root.clone()], &layout(), &[off]).unwrap();
            prop_assert_eq!(shifted.rows(), off + 3);
            prop_assert_eq!(&shifted.b[off..], &alone.b[..]);
        }
    }
}

#[test]
fn test_recipe_shapes() {
    let r = Recipe::Spread(Box::new(Recipe::Reverse(Box::new(Recipe::Var(1)))));
    assert_eq!(r.build().shape(), Shape::vector(3));
    let data = build_without_offsets(&[r.build()], &layout()).unwrap();
    assert_eq!(data.cols(), 6);
    assert_close(&data.b, &[0.0; 3], "spread of a variable");
}
