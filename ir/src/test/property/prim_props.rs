//! Analyzer laws over generated symbolic expressions.

use proptest::prelude::*;

use crate::prim::Analyzer;
use crate::proptest_gen::arb_prim_expr;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Addition and multiplication are commutative under the analyzer.
    #[test]
    fn prop_commutativity((a, b) in (arb_prim_expr(), arb_prim_expr())) {
        let analyzer = Analyzer::new();
        prop_assert!(analyzer.can_prove_equal(&(a.clone() + b.clone()), &(b.clone() + a.clone())));
        prop_assert!(analyzer.can_prove_equal(&(a.clone() * b.clone()), &(b * a)));
    }

    /// Subtracting an expression from itself is zero.
    #[test]
    fn prop_self_difference_is_zero(a in arb_prim_expr()) {
        let analyzer = Analyzer::new();
        prop_assert!(analyzer.can_prove_equal(&(a.clone() - a), &crate::prim::PrimExpr::Int(0)));
    }

    /// Simplification is idempotent and preserves meaning.
    #[test]
    fn prop_simplify_idempotent(a in arb_prim_expr()) {
        let analyzer = Analyzer::new();
        let once = analyzer.simplify(&a);
        prop_assert!(analyzer.can_prove_equal(&a, &once));
        prop_assert_eq!(analyzer.simplify(&once), once.clone());
    }

    /// Associativity of addition.
    #[test]
    fn prop_add_associative((a, b, c) in (arb_prim_expr(), arb_prim_expr(), arb_prim_expr())) {
        let analyzer = Analyzer::new();
        let lhs = (a.clone() + b.clone()) + c.clone();
        let rhs = a + (b + c);
        prop_assert!(analyzer.can_prove_equal(&lhs, &rhs));
    }
}
