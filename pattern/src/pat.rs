//! Pattern trees.
//!
//! Patterns form a tagged tree that mirrors the expression variants and
//! adds predicates and combinators. Nodes carry a stable `id` (the memo
//! key of the matcher) and are shared via [`PatternRef`]; reusing one
//! pattern node in several positions is the way to express back-references,
//! since a pattern can only ever bind to a single expression per match.
//!
//! Construction goes through the `is_*` constructors and the fluent
//! predicate methods, with `|`, `&`, and `!` overloaded for alternation,
//! conjunction, and negation:
//!
//! ```ignore
//! // add(x, y) where the call result is a float32 tensor
//! let pat = Pattern::is_op("add")
//!     .call(vec![Pattern::wildcard(), Pattern::wildcard()])
//!     .has_dtype(DType::Float32);
//! ```

use std::cell::Cell;
use std::rc::Rc;

use rill_dtype::DType;
use rill_ir::attrs::Attrs;
use rill_ir::expr::{Expr, ExprRef};
use rill_ir::prim::PrimExpr;
use rill_ir::ty::Type;

// Stable pattern IDs from a thread-local counter, mirroring expression IDs.
thread_local! {
    static PATTERN_ID_COUNTER: Cell<u64> = const { Cell::new(0) };
}

fn next_pattern_id() -> u64 {
    PATTERN_ID_COUNTER.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        id
    })
}

/// Shared handle to a pattern node.
pub type PatternRef = Rc<Pattern>;

/// A node in the pattern tree.
#[derive(Debug)]
pub struct Pattern {
    id: u64,
    kind: PatternKind,
}

/// The pattern variants.
///
/// `fields`/`args`/`params` of `None` leave the arity unconstrained; a
/// `TupleGetItem` index of `-1` accepts any index.
#[derive(Debug)]
pub enum PatternKind {
    /// Matches anything.
    Wildcard,
    /// Matches expressions structurally equal to a literal.
    ExprLiteral { expr: ExprRef },
    /// Matches `Var` and `DataflowVar` nodes; an empty hint matches any
    /// name.
    Var { name_hint: String },
    /// Matches `DataflowVar` nodes only.
    DataflowVar { name_hint: String },
    GlobalVar { name_hint: String },
    ExternFunc { symbol: String },
    /// Matches any constant; values are not compared.
    Constant,
    /// Matches expressions whose shape is only known at runtime.
    RuntimeDepShape,
    Tuple { fields: Option<Vec<PatternRef>> },
    TupleGetItem { tuple: PatternRef, index: i64 },
    Call { op: PatternRef, args: Option<Vec<PatternRef>> },
    Function { params: Option<Vec<PatternRef>>, body: PatternRef },
    If { cond: PatternRef, then_branch: PatternRef, else_branch: PatternRef },
    /// Matches shape literals element-wise under the arithmetic analyzer.
    PrimArr { fields: Vec<PrimExpr> },
    /// Attribute constraints on top of an inner pattern.
    Attr { pattern: PatternRef, attrs: Attrs },
    /// Checked-type constraint on top of an inner pattern.
    Type { pattern: PatternRef, ty: Type },
    /// Symbolic shape constraint on top of an inner pattern.
    Shape { pattern: PatternRef, shape: Vec<PrimExpr> },
    /// Tensor dtype constraint on top of an inner pattern.
    DataType { pattern: PatternRef, dtype: DType },
    Alt { left: PatternRef, right: PatternRef },
    And { left: PatternRef, right: PatternRef },
    Not { reject: PatternRef },
    /// `child` matched at the root of the relationship, `path` allowed on
    /// every intermediate input, `parent` somewhere in the dominated
    /// region.
    Dominator { child: PatternRef, path: PatternRef, parent: PatternRef },
}

impl Pattern {
    fn make(kind: PatternKind) -> PatternRef {
        Rc::new(Self { id: next_pattern_id(), kind })
    }

    /// Stable node identity; the matcher's memo key.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    // Leaf constructors.

    pub fn wildcard() -> PatternRef {
        Self::make(PatternKind::Wildcard)
    }

    /// Match expressions structurally equal to `expr`.
    pub fn is_expr(expr: ExprRef) -> PatternRef {
        Self::make(PatternKind::ExprLiteral { expr })
    }

    /// Match the operator primitive `name`; combine with [`Pattern::call`]
    /// to match calls to it.
    pub fn is_op(name: impl Into<String>) -> PatternRef {
        Self::is_expr(Expr::op(name))
    }

    pub fn is_var(name_hint: impl Into<String>) -> PatternRef {
        Self::make(PatternKind::Var { name_hint: name_hint.into() })
    }

    pub fn is_dataflow_var(name_hint: impl Into<String>) -> PatternRef {
        Self::make(PatternKind::DataflowVar { name_hint: name_hint.into() })
    }

    pub fn is_global_var(name_hint: impl Into<String>) -> PatternRef {
        Self::make(PatternKind::GlobalVar { name_hint: name_hint.into() })
    }

    pub fn is_extern_func(symbol: impl Into<String>) -> PatternRef {
        Self::make(PatternKind::ExternFunc { symbol: symbol.into() })
    }

    pub fn is_const() -> PatternRef {
        Self::make(PatternKind::Constant)
    }

    pub fn is_runtime_dep_shape() -> PatternRef {
        Self::make(PatternKind::RuntimeDepShape)
    }

    // Structural constructors.

    pub fn is_tuple(fields: Vec<PatternRef>) -> PatternRef {
        Self::make(PatternKind::Tuple { fields: Some(fields) })
    }

    /// Tuple of any arity.
    pub fn is_tuple_any() -> PatternRef {
        Self::make(PatternKind::Tuple { fields: None })
    }

    /// `index` of `-1` accepts any index.
    pub fn is_tuple_get_item(tuple: PatternRef, index: i64) -> PatternRef {
        Self::make(PatternKind::TupleGetItem { tuple, index })
    }

    pub fn is_function(params: Option<Vec<PatternRef>>, body: PatternRef) -> PatternRef {
        Self::make(PatternKind::Function { params, body })
    }

    pub fn is_if(cond: PatternRef, then_branch: PatternRef, else_branch: PatternRef) -> PatternRef {
        Self::make(PatternKind::If { cond, then_branch, else_branch })
    }

    pub fn is_prim_arr(fields: Vec<PrimExpr>) -> PatternRef {
        Self::make(PatternKind::PrimArr { fields })
    }

    /// Dominator relationship: some expression matching `child` whose
    /// inputs reach an expression matching `parent` through nodes matching
    /// `path` on every step.
    pub fn dominator(child: PatternRef, path: PatternRef, parent: PatternRef) -> PatternRef {
        Self::make(PatternKind::Dominator { child, path, parent })
    }

    // Fluent builders.

    /// Call with these argument sub-patterns, `self` as the callee.
    pub fn call(self: &Rc<Self>, args: Vec<PatternRef>) -> PatternRef {
        Self::make(PatternKind::Call { op: self.clone(), args: Some(args) })
    }

    /// Call with unconstrained arguments, `self` as the callee.
    pub fn call_any(self: &Rc<Self>) -> PatternRef {
        Self::make(PatternKind::Call { op: self.clone(), args: None })
    }

    /// Require attribute entries on top of this pattern.
    pub fn has_attr(self: &Rc<Self>, attrs: Attrs) -> PatternRef {
        Self::make(PatternKind::Attr { pattern: self.clone(), attrs })
    }

    /// Require a checked type on top of this pattern.
    pub fn has_type(self: &Rc<Self>, ty: Type) -> PatternRef {
        Self::make(PatternKind::Type { pattern: self.clone(), ty })
    }

    /// Require a symbolic shape on top of this pattern.
    pub fn has_shape(self: &Rc<Self>, shape: Vec<PrimExpr>) -> PatternRef {
        Self::make(PatternKind::Shape { pattern: self.clone(), shape })
    }

    /// Require a tensor dtype on top of this pattern.
    pub fn has_dtype(self: &Rc<Self>, dtype: DType) -> PatternRef {
        Self::make(PatternKind::DataType { pattern: self.clone(), dtype })
    }

    /// Operator name when this pattern is an `is_op` literal.
    pub(crate) fn op_literal_name(&self) -> Option<&str> {
        match &self.kind {
            PatternKind::ExprLiteral { expr } => expr.op_name(),
            _ => None,
        }
    }
}

impl std::ops::BitOr for Rc<Pattern> {
    type Output = Rc<Pattern>;

    /// Alternation: `a | b` matches when either side matches.
    fn bitor(self, rhs: Rc<Pattern>) -> Rc<Pattern> {
        Pattern::make(PatternKind::Alt { left: self, right: rhs })
    }
}

impl std::ops::BitAnd for Rc<Pattern> {
    type Output = Rc<Pattern>;

    /// Conjunction: `a & b` matches when both sides match.
    fn bitand(self, rhs: Rc<Pattern>) -> Rc<Pattern> {
        Pattern::make(PatternKind::And { left: self, right: rhs })
    }
}

impl std::ops::Not for Rc<Pattern> {
    type Output = Rc<Pattern>;

    /// Negation: `!a` matches when `a` does not.
    fn not(self) -> Rc<Pattern> {
        Pattern::make(PatternKind::Not { reject: self })
    }
}
