//! Dataflow pattern matching for the rill IR.
//!
//! A [`pat::Pattern`] tree describes the shape of an expression: structural
//! variants mirror the expression variants, predicate variants constrain
//! attributes, types, shapes, and dtypes, and combinators provide
//! alternation, conjunction, negation, and dominator relationships. The
//! [`matcher::DFPatternMatcher`] decides whether a pattern matches an
//! expression by recursive descent with memoization and watermark-based
//! rollback; after a successful match the memo doubles as a capture table.
//!
//! ```ignore
//! use rill_ir::Expr;
//! use rill_pattern::{match_pattern, pat::Pattern};
//!
//! let expr = Expr::call_op("add", vec![Expr::var("a"), Expr::var("b")]);
//! let pattern = Pattern::is_op("add").call(vec![Pattern::wildcard(), Pattern::wildcard()]);
//! assert!(match_pattern(&pattern, &expr));
//! ```

pub mod error;
pub mod graph;
pub mod matcher;
pub mod pat;
pub mod registry;
pub mod rewrite;

#[cfg(test)]
pub mod test;

pub use error::{Error, Result};
pub use graph::ExprGraph;
pub use matcher::{DFPatternMatcher, match_expr_pattern, match_pattern};
pub use pat::{Pattern, PatternKind, PatternRef};
pub use rewrite::DataflowBlockRewrite;
