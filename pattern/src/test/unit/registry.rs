//! Entry-point registry.

use rill_ir::block::{Binding, DataflowBlock, var_to_value};
use rill_ir::expr::Expr;

use crate::pat::Pattern;
use crate::registry::{MATCH_EXPR_PATTERN, MATCH_PATTERN, get, registered};

#[test]
fn test_entries_are_registered() {
    assert!(registered(MATCH_PATTERN));
    assert!(registered(MATCH_EXPR_PATTERN));
    assert!(!registered("relax.dataflow_pattern.rewrite"));
    assert!(get("relax.dataflow_pattern.rewrite").is_none());
}

#[test]
fn test_match_entry_roundtrip() {
    let entry = get(MATCH_PATTERN).unwrap();
    let expr = Expr::call_op("add", vec![Expr::var("a"), Expr::var("b")]);
    let pattern = Pattern::is_op("add").call(vec![Pattern::wildcard(), Pattern::wildcard()]);
    assert!(entry(&pattern, &expr, None));
    assert!(!entry(&Pattern::is_const(), &expr, None));
}

#[test]
fn test_match_expr_entry_jumps() {
    let entry = get(MATCH_EXPR_PATTERN).unwrap();
    let v = Expr::var("v");
    let value = Expr::call_op("add", vec![Expr::var("a"), Expr::var("b")]);
    let block = DataflowBlock::new(vec![Binding::new(v.clone(), value).unwrap()]);
    let var2val = var_to_value(&block);

    let pattern = Pattern::is_op("add").call_any();
    assert!(entry(&pattern, &v, Some(&var2val)));
    assert!(!entry(&pattern, &v, None));
}
