//! Alternation, conjunction, negation, memoization, and state reset.

use rill_dtype::DType;
use rill_ir::expr::Expr;

use crate::matcher::{DFPatternMatcher, match_pattern};
use crate::pat::Pattern;

#[test]
fn test_alt_short_circuits() {
    let c = Expr::constant(DType::Int32, vec![]);
    assert!(match_pattern(&(Pattern::is_const() | Pattern::is_var("")), &c));
    assert!(match_pattern(&(Pattern::is_var("") | Pattern::is_const()), &c));
    assert!(!match_pattern(&(Pattern::is_var("") | Pattern::is_tuple_any()), &c));
}

#[test]
fn test_and_requires_both() {
    let c = Expr::constant(DType::Float32, vec![4]);
    let both = Pattern::is_const() & Pattern::wildcard().has_dtype(DType::Float32);
    assert!(match_pattern(&both, &c));

    let conflicting = Pattern::is_const() & Pattern::is_var("");
    assert!(!match_pattern(&conflicting, &c));
}

#[test]
fn test_not_duality() {
    let c = Expr::constant(DType::Int32, vec![]);
    let v = Expr::var("x");

    assert!(!match_pattern(&!Pattern::is_const(), &c));
    assert!(match_pattern(&!Pattern::is_const(), &v));
}

#[test]
fn test_not_leaves_no_bindings() {
    let v = Expr::var("x");
    let reject = Pattern::is_const();
    let pattern = !reject.clone();

    let mut matcher = DFPatternMatcher::new(&v);
    assert!(matcher.matches(&pattern, &v));
    // The rejected pattern bound nothing; only the Not node itself is
    // memoized.
    assert!(matcher.matched(&reject).is_none());
    assert!(matcher.matched(&pattern).is_some());
}

#[test]
fn test_shared_pattern_enforces_back_reference() {
    let p = Pattern::is_var("");
    let pattern = Pattern::is_tuple(vec![p.clone(), p.clone()]);

    let a = Expr::var("a");
    assert!(match_pattern(&pattern, &Expr::tuple(vec![a.clone(), a.clone()])));
    assert!(!match_pattern(&pattern, &Expr::tuple(vec![a, Expr::var("b")])));
}

#[test]
fn test_memo_is_a_capture_table() {
    let lhs = Pattern::is_var("");
    let rhs = Pattern::is_const();
    let pattern = Pattern::is_op("add").call(vec![lhs.clone(), rhs.clone()]);

    let a = Expr::var("a");
    let k = Expr::constant(DType::Int32, vec![]);
    let expr = Expr::call_op("add", vec![a.clone(), k.clone()]);

    let mut matcher = DFPatternMatcher::new(&expr);
    assert!(matcher.matches(&pattern, &expr));
    assert!(matcher.matched(&lhs).unwrap().same_as(&a));
    assert!(matcher.matched(&rhs).unwrap().same_as(&k));
    assert!(matcher.matched(&pattern).unwrap().same_as(&expr));
}

#[test]
fn test_state_is_empty_after_failure() {
    let pattern = Pattern::is_op("add").call(vec![Pattern::is_var(""), Pattern::is_const()]);
    let expr = Expr::call_op("add", vec![Expr::var("a"), Expr::var("b")]);

    let mut matcher = DFPatternMatcher::new(&expr);
    assert!(!matcher.matches(&pattern, &expr));
    assert_eq!(matcher.memo_len(), 0);
    assert_eq!(matcher.matched_nodes_len(), 0);
}

#[test]
fn test_state_is_consistent_after_success() {
    let pattern = Pattern::is_op("add").call(vec![Pattern::is_var(""), Pattern::is_const()]);
    let expr = Expr::call_op("add", vec![Expr::var("a"), Expr::constant(DType::Int32, vec![])]);

    let mut matcher = DFPatternMatcher::new(&expr);
    assert!(matcher.matches(&pattern, &expr));
    assert_eq!(matcher.memo_len(), matcher.matched_nodes_len());
}

#[test]
fn test_matcher_is_reusable() {
    let pattern = Pattern::is_const();
    let c = Expr::constant(DType::Int32, vec![]);
    let v = Expr::var("x");

    let mut matcher = DFPatternMatcher::new(&c);
    assert!(matcher.matches(&pattern, &c));
    assert!(!matcher.matches(&pattern, &v));
    assert!(matcher.matches(&pattern, &c));
}

#[test]
fn test_alt_keeps_first_matching_side() {
    let left = Pattern::is_const();
    let right = Pattern::wildcard();
    let pattern = left.clone() | right.clone();

    let c = Expr::constant(DType::Int32, vec![]);
    let mut matcher = DFPatternMatcher::new(&c);
    assert!(matcher.matches(&pattern, &c));
    // Left matched, so the right side was never attempted.
    assert!(matcher.matched(&left).is_some());
    assert!(matcher.matched(&right).is_none());
}
