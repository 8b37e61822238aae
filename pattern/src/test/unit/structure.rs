//! Structural pattern variants: tuples, projections, functions, ifs.

use rill_dtype::DType;
use rill_ir::expr::Expr;

use crate::matcher::match_pattern;
use crate::pat::Pattern;

#[test]
fn test_tuple_fields_match_pairwise() {
    let expr = Expr::tuple(vec![Expr::var("a"), Expr::constant(DType::Int32, vec![])]);

    let pattern = Pattern::is_tuple(vec![Pattern::is_var(""), Pattern::is_const()]);
    assert!(match_pattern(&pattern, &expr));

    let swapped = Pattern::is_tuple(vec![Pattern::is_const(), Pattern::is_var("")]);
    assert!(!match_pattern(&swapped, &expr));
}

#[test]
fn test_tuple_arity_must_agree_when_constrained() {
    let expr = Expr::tuple(vec![Expr::var("a"), Expr::var("b")]);
    assert!(!match_pattern(&Pattern::is_tuple(vec![Pattern::wildcard()]), &expr));
    assert!(match_pattern(&Pattern::is_tuple_any(), &expr));
    assert!(match_pattern(&Pattern::is_tuple_any(), &Expr::tuple(vec![])));
    assert!(!match_pattern(&Pattern::is_tuple_any(), &Expr::var("a")));
}

#[test]
fn test_tuple_get_item_index() {
    let tuple = Expr::tuple(vec![Expr::var("a"), Expr::var("b")]);
    let expr = Expr::tuple_get_item(tuple, 1);

    assert!(match_pattern(&Pattern::is_tuple_get_item(Pattern::is_tuple_any(), 1), &expr));
    assert!(match_pattern(&Pattern::is_tuple_get_item(Pattern::is_tuple_any(), -1), &expr));
    assert!(!match_pattern(&Pattern::is_tuple_get_item(Pattern::is_tuple_any(), 0), &expr));
    assert!(!match_pattern(&Pattern::is_tuple_get_item(Pattern::is_tuple_any(), 1), &Expr::var("x")));
}

#[test]
fn test_tuple_get_item_recurses_into_tuple() {
    let tuple = Expr::tuple(vec![Expr::var("a")]);
    let expr = Expr::tuple_get_item(tuple, 0);

    let inner = Pattern::is_tuple(vec![Pattern::is_var("a")]);
    assert!(match_pattern(&Pattern::is_tuple_get_item(inner, 0), &expr));

    let wrong_inner = Pattern::is_tuple(vec![Pattern::is_const()]);
    assert!(!match_pattern(&Pattern::is_tuple_get_item(wrong_inner, 0), &expr));
}

#[test]
fn test_function_params_optional() {
    let x = Expr::var("x");
    let func = Expr::function(vec![x.clone()], Expr::call_op("relu", vec![x]));

    let any_params = Pattern::is_function(None, Pattern::is_op("relu").call_any());
    assert!(match_pattern(&any_params, &func));

    let one_param =
        Pattern::is_function(Some(vec![Pattern::is_var("")]), Pattern::is_op("relu").call_any());
    assert!(match_pattern(&one_param, &func));

    let two_params = Pattern::is_function(
        Some(vec![Pattern::is_var(""), Pattern::is_var("")]),
        Pattern::wildcard(),
    );
    assert!(!match_pattern(&two_params, &func));

    let wrong_body = Pattern::is_function(None, Pattern::is_op("sigmoid").call_any());
    assert!(!match_pattern(&wrong_body, &func));
}

#[test]
fn test_if_matches_all_three_parts() {
    let expr = Expr::if_then_else(
        Expr::var("cond"),
        Expr::constant(DType::Int32, vec![]),
        Expr::var("other"),
    );

    let pattern = Pattern::is_if(Pattern::is_var(""), Pattern::is_const(), Pattern::is_var(""));
    assert!(match_pattern(&pattern, &expr));

    let wrong_then = Pattern::is_if(Pattern::is_var(""), Pattern::is_var(""), Pattern::is_var(""));
    assert!(!match_pattern(&wrong_then, &expr));

    assert!(!match_pattern(&pattern, &Expr::var("not_an_if")));
}
