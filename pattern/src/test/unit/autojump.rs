//! Variable-to-value jumping.

use rill_dtype::DType;
use rill_ir::block::{Binding, DataflowBlock, Var2Val, var_to_value};
use rill_ir::expr::{Expr, ExprRef};
use rill_ir::prim::PrimExpr;
use rill_ir::ty::Type;

use crate::matcher::match_expr_pattern;
use crate::pat::Pattern;

fn bound(var: &ExprRef, value: &ExprRef) -> Var2Val {
    let block =
        DataflowBlock::new(vec![Binding::new(var.clone(), value.clone()).unwrap()]);
    var_to_value(&block)
}

#[test]
fn test_jump_reaches_bound_value() {
    let v = Expr::var("v");
    let value = Expr::call_op("add", vec![Expr::var("a"), Expr::var("b")]);
    let var2val = bound(&v, &value);

    let pattern = Pattern::is_op("add").call(vec![Pattern::wildcard(), Pattern::wildcard()]);
    assert!(match_expr_pattern(&pattern, &v, Some(&var2val)));
    // Without the map the variable is just a variable.
    assert!(!match_expr_pattern(&pattern, &v, None));
}

#[test]
fn test_unbound_vars_do_not_jump() {
    let v = Expr::var("v");
    let pattern = Pattern::is_op("add").call_any();
    assert!(!match_expr_pattern(&pattern, &v, Some(&Var2Val::new())));
}

#[test]
fn test_var_pattern_sees_the_variable_itself() {
    let v = Expr::var("v");
    let value = Expr::constant(DType::Int32, vec![]);
    let var2val = bound(&v, &value);

    // Variable patterns opt out of the jump.
    assert!(match_expr_pattern(&Pattern::is_var("v"), &v, Some(&var2val)));
    // Value-sensitive patterns jump.
    assert!(match_expr_pattern(&Pattern::is_const(), &v, Some(&var2val)));
}

#[test]
fn test_shape_pattern_reads_the_variable_shape() {
    let n = PrimExpr::var("n");
    let v = Expr::var("v").with_shape(Expr::shape_expr(vec![n.clone(), PrimExpr::int(3)]));
    let value = Expr::constant(DType::Float32, vec![4, 4]);
    let var2val = bound(&v, &value);

    // The shape accessor is variable-safe: no jump happens, so the
    // variable's own annotation decides.
    let var_shape = Pattern::wildcard().has_shape(vec![n, PrimExpr::int(3)]);
    assert!(match_expr_pattern(&var_shape, &v, Some(&var2val)));

    let value_shape = Pattern::wildcard().has_shape(vec![PrimExpr::int(4), PrimExpr::int(4)]);
    assert!(!match_expr_pattern(&value_shape, &v, Some(&var2val)));
}

#[test]
fn test_dtype_pattern_reads_the_variable_type() {
    let v = Expr::var("v").with_type(Type::Tensor { ndim: 1, dtype: DType::Int32 });
    let value = Expr::constant(DType::Float32, vec![4]);
    let var2val = bound(&v, &value);

    assert!(match_expr_pattern(&Pattern::wildcard().has_dtype(DType::Int32), &v, Some(&var2val)));
    assert!(!match_expr_pattern(
        &Pattern::wildcard().has_dtype(DType::Float32),
        &v,
        Some(&var2val)
    ));
}

#[test]
fn test_type_pattern_jumps() {
    let v = Expr::var("v");
    let value = Expr::constant(DType::Float32, vec![]);
    let var2val = bound(&v, &value);

    let of_value = Pattern::wildcard().has_type(Type::Tensor { ndim: 0, dtype: DType::Float32 });
    assert!(match_expr_pattern(&of_value, &v, Some(&var2val)));
}

#[test]
fn test_jump_applies_at_every_recursion_step() {
    // add(v, w) where v and w are bound to constants: the argument
    // positions jump too.
    let v = Expr::var("v");
    let w = Expr::var("w");
    let block = DataflowBlock::new(vec![
        Binding::new(v.clone(), Expr::constant(DType::Int32, vec![])).unwrap(),
        Binding::new(w.clone(), Expr::constant(DType::Int32, vec![])).unwrap(),
    ]);
    let var2val = var_to_value(&block);

    let expr = Expr::call_op("add", vec![v, w]);
    let pattern = Pattern::is_op("add").call(vec![Pattern::is_const(), Pattern::is_const()]);
    assert!(match_expr_pattern(&pattern, &expr, Some(&var2val)));
}
