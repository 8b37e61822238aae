//! Dominator pattern matching over derived expression graphs.

use rill_ir::expr::{Expr, ExprRef};

use crate::matcher::{DFPatternMatcher, match_pattern};
use crate::pat::{Pattern, PatternRef};

/// conv2d -> (relu, leaky_relu) -> add: the canonical diamond.
fn diamond() -> ExprRef {
    let conv = Expr::call_op("conv2d", vec![Expr::var("data"), Expr::var("weight")]);
    let left = Expr::call_op("relu", vec![conv.clone()]);
    let right = Expr::call_op("leaky_relu", vec![conv]);
    Expr::call_op("add", vec![left, right])
}

fn conv_pattern() -> PatternRef {
    Pattern::is_op("conv2d").call(vec![Pattern::wildcard(), Pattern::wildcard()])
}

#[test]
fn test_diamond_dominated_by_conv() {
    let expr = diamond();
    let child = Pattern::is_op("add").call(vec![Pattern::wildcard(), Pattern::wildcard()]);
    let pattern = Pattern::dominator(child, Pattern::wildcard(), conv_pattern());
    assert!(match_pattern(&pattern, &expr));
}

#[test]
fn test_diamond_without_parent_fails() {
    // Same diamond on top of a max_pool2d: no conv2d to find.
    let pool = Expr::call_op("max_pool2d", vec![Expr::var("data")]);
    let left = Expr::call_op("relu", vec![pool.clone()]);
    let right = Expr::call_op("leaky_relu", vec![pool]);
    let expr = Expr::call_op("add", vec![left, right]);

    let child = Pattern::is_op("add").call(vec![Pattern::wildcard(), Pattern::wildcard()]);
    let pattern = Pattern::dominator(child, Pattern::wildcard(), conv_pattern());
    assert!(!match_pattern(&pattern, &expr));
}

#[test]
fn test_path_constraint_holds_on_every_input() {
    let expr = diamond();
    let child = Pattern::is_op("add").call(vec![Pattern::wildcard(), Pattern::wildcard()]);

    // Only relu allowed on the path, but one branch is a leaky_relu.
    let relu_path = Pattern::is_op("relu").call_any();
    let pattern = Pattern::dominator(child.clone(), relu_path, conv_pattern());
    assert!(!match_pattern(&pattern, &expr));

    // Either flavor of relu on the path is fine.
    let elemwise_path = Pattern::is_op("relu").call_any() | Pattern::is_op("leaky_relu").call_any();
    let pattern = Pattern::dominator(child, elemwise_path, conv_pattern());
    assert!(match_pattern(&pattern, &expr));
}

#[test]
fn test_child_must_match_first() {
    let expr = diamond();
    let child = Pattern::is_op("multiply").call(vec![Pattern::wildcard(), Pattern::wildcard()]);
    let pattern = Pattern::dominator(child, Pattern::wildcard(), conv_pattern());
    assert!(!match_pattern(&pattern, &expr));
}

#[test]
fn test_direct_parent_input() {
    // relu(conv2d(...)): the parent is the immediate input of the child.
    let conv = Expr::call_op("conv2d", vec![Expr::var("data"), Expr::var("weight")]);
    let expr = Expr::call_op("relu", vec![conv]);

    let child = Pattern::is_op("relu").call_any();
    let pattern = Pattern::dominator(child, Pattern::wildcard(), conv_pattern());
    assert!(match_pattern(&pattern, &expr));
}

#[test]
fn test_parent_captured_in_memo() {
    let expr = diamond();
    let child = Pattern::is_op("add").call(vec![Pattern::wildcard(), Pattern::wildcard()]);
    let parent = conv_pattern();
    let pattern = Pattern::dominator(child, Pattern::wildcard(), parent.clone());

    let mut matcher = DFPatternMatcher::new(&expr);
    assert!(matcher.matches(&pattern, &expr));
    let bound = matcher.matched(&parent).expect("parent committed");
    assert!(matches!(
        bound.kind(),
        rill_ir::expr::ExprKind::Call { op, .. } if op.op_name() == Some("conv2d")
    ));
}

#[test]
fn test_escaping_use_breaks_domination() {
    // The conv feeds the add both through the relus and directly past it:
    // multiply(add(relu(conv), leaky_relu(conv)), conv). Rooted at the
    // multiply, the conv is no longer dominated by the add.
    let conv = Expr::call_op("conv2d", vec![Expr::var("data"), Expr::var("weight")]);
    let left = Expr::call_op("relu", vec![conv.clone()]);
    let right = Expr::call_op("leaky_relu", vec![conv.clone()]);
    let add = Expr::call_op("add", vec![left, right]);
    let root = Expr::call_op("multiply", vec![add.clone(), conv]);

    let child = Pattern::is_op("add").call(vec![Pattern::wildcard(), Pattern::wildcard()]);
    let pattern = Pattern::dominator(child, Pattern::wildcard(), conv_pattern());

    let mut matcher = DFPatternMatcher::new(&root);
    assert!(!matcher.matches(&pattern, &add));
}
