//! Proptest strategies for expressions and symbolic integers.
//!
//! Gated behind the `proptest` feature so downstream crates can drive their
//! property suites with the same generators.

use proptest::prelude::*;

use rill_dtype::DType;

use crate::expr::{Expr, ExprRef};
use crate::prim::PrimExpr;

/// Generate a dtype suitable for tensor constants.
pub fn arb_tensor_dtype() -> impl Strategy<Value = DType> {
    prop_oneof![
        Just(DType::Bool),
        Just(DType::Int32),
        Just(DType::Int64),
        Just(DType::Float16),
        Just(DType::Float32),
        Just(DType::Float64),
    ]
}

/// Generate a symbolic integer of bounded depth over variables `n` and `m`.
pub fn arb_prim_expr() -> impl Strategy<Value = PrimExpr> {
    let leaf = prop_oneof![
        (-8i64..=8).prop_map(PrimExpr::Int),
        prop_oneof![Just("n"), Just("m")].prop_map(|name| PrimExpr::var(name)),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a + b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a - b),
            (inner.clone(), inner).prop_map(|(a, b)| a * b),
        ]
    })
}

/// Generate a leaf expression.
pub fn arb_leaf_expr() -> impl Strategy<Value = ExprRef> {
    prop_oneof![
        (arb_tensor_dtype(), proptest::collection::vec(1i64..=8, 0..3))
            .prop_map(|(dtype, dims)| Expr::constant(dtype, dims)),
        "[a-z]{1,4}".prop_map(|name| Expr::var(name)),
        "[a-z]{1,4}".prop_map(|name| Expr::dataflow_var(name)),
        "[a-z]{1,4}".prop_map(|name| Expr::global_var(name)),
        "[a-z_]{1,8}".prop_map(|name| Expr::extern_func(name)),
    ]
}

/// Generate an expression tree of bounded depth: leaves combined through
/// tuples, projections, conditionals, and calls to a small op vocabulary.
pub fn arb_expr() -> impl Strategy<Value = ExprRef> {
    arb_leaf_expr().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..3).prop_map(Expr::tuple),
            (inner.clone(), 0i64..3).prop_map(|(t, i)| Expr::tuple_get_item(t, i)),
            (prop_oneof![Just("add"), Just("multiply"), Just("relu")], inner.clone(), inner.clone())
                .prop_map(|(op, a, b)| Expr::call_op(op, vec![a, b])),
            (inner.clone(), inner.clone(), inner)
                .prop_map(|(c, t, e)| Expr::if_then_else(c, t, e)),
        ]
    })
}
