//! Structural equality laws over generated expressions.

use proptest::prelude::*;

use crate::proptest_gen::arb_expr;
use crate::structural::{structural_equal, structural_equal_with};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every expression equals itself.
    #[test]
    fn prop_reflexive(e in arb_expr()) {
        prop_assert!(structural_equal(&e, &e));
        prop_assert!(structural_equal_with(&e, &e, true));
    }

    /// Equality is symmetric, with and without free-variable mapping.
    #[test]
    fn prop_symmetric((a, b) in (arb_expr(), arb_expr())) {
        prop_assert_eq!(structural_equal(&a, &b), structural_equal(&b, &a));
        prop_assert_eq!(structural_equal_with(&a, &b, true), structural_equal_with(&b, &a, true));
    }
}
