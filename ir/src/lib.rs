//! Expression model for a Relax-style dataflow IR.
//!
//! The crate provides the tree of [`Expr`] nodes that the pattern matcher
//! walks, together with the oracles the matcher consults: symbolic integer
//! arithmetic ([`prim`]), type inference ([`ty`]), deep structural equality
//! ([`structural`]), attribute dictionaries and the op-attribute registry
//! ([`attrs`]), and the binding-block model with its variable analyses
//! ([`block`]).
//!
//! Expressions are immutable, reference counted, and carry a stable `id`
//! assigned from a thread-local counter. Identity-based reasoning (memo
//! tables, visited sets) uses those ids; value-based reasoning goes through
//! [`structural::structural_equal`]. Handles are `Rc` and deliberately
//! `!Send`: one matcher owns one expression graph on one thread.

pub mod attrs;
pub mod block;
pub mod error;
pub mod expr;
pub mod prim;
pub mod structural;
pub mod ty;

#[cfg(any(test, feature = "proptest"))]
pub mod proptest_gen;

#[cfg(test)]
pub mod test;

pub use attrs::{AttrValue, Attrs};
pub use block::{Binding, DataflowBlock, IRModule, Var2Val};
pub use error::{Error, Result};
pub use expr::{Expr, ExprKind, ExprRef};
pub use prim::{Analyzer, PrimExpr};
pub use structural::{structural_equal, structural_equal_with};
pub use ty::{Type, infer_type};

pub use rill_dtype::DType;
