//! The dataflow pattern matcher.
//!
//! Matching is recursive descent over the pattern tree with two pieces of
//! state: a memo from pattern identity to the one expression it matched,
//! and an insertion-ordered stack of matched pattern ids. The stack length
//! is captured as a watermark before every attempt; a failed attempt rolls
//! the memo back to its watermark, which is what makes alternation,
//! commutative retries, and the associative rewrites cheap to explore.
//!
//! The memo also enforces back-references: a pattern node that already
//! matched can only ever re-match the exact same expression object. After
//! a successful match the memo doubles as the capture table, read through
//! [`DFPatternMatcher::matched`].

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

use rill_ir::attrs::{self, attr_value_structural_eq, match_retvalue};
use rill_ir::block::Var2Val;
use rill_ir::expr::{ExprKind, ExprRef};
use rill_ir::prim::Analyzer;
use rill_ir::structural::structural_equal;
use rill_ir::ty::Type;

use crate::graph::ExprGraph;
use crate::pat::{PatternKind, PatternRef};

/// Match `pattern` against `expr`.
pub fn match_pattern(pattern: &PatternRef, expr: &ExprRef) -> bool {
    DFPatternMatcher::new(expr).matches(pattern, expr)
}

/// Match `pattern` against `expr`, jumping from variables to their bound
/// values when `var2val` is supplied.
pub fn match_expr_pattern(pattern: &PatternRef, expr: &ExprRef, var2val: Option<&Var2Val>) -> bool {
    match var2val {
        Some(var2val) => DFPatternMatcher::with_var2val(expr, var2val.clone()).matches(pattern, expr),
        None => match_pattern(pattern, expr),
    }
}

pub struct DFPatternMatcher {
    graph: ExprGraph,
    var2val: Var2Val,
    autojump: bool,
    analyzer: Analyzer,
    /// Pattern id -> matched expression. A single binding per pattern is
    /// an invariant; the vector only grows past one during non-memoizing
    /// dominator exploration and is asserted on every memoized read.
    memo: HashMap<u64, SmallVec<[ExprRef; 1]>>,
    /// Insertion-ordered pattern ids; truncated on rollback.
    matched_nodes: Vec<u64>,
    /// Suspended while exploring dominator paths.
    memoize: bool,
}

impl DFPatternMatcher {
    /// Matcher over the graph rooted at `root`, without auto-jumping.
    pub fn new(root: &ExprRef) -> Self {
        Self {
            graph: ExprGraph::new(root),
            var2val: Var2Val::new(),
            autojump: false,
            analyzer: Analyzer::new(),
            memo: HashMap::new(),
            matched_nodes: Vec::new(),
            memoize: true,
        }
    }

    /// Matcher that substitutes variables by their bound values at every
    /// recursion step, for the pattern variants that care about values.
    pub fn with_var2val(root: &ExprRef, var2val: Var2Val) -> Self {
        Self { var2val, autojump: true, ..Self::new(root) }
    }

    /// Whether `pattern` matches `expr`. State is reset on entry, so the
    /// matcher can be reused across calls.
    pub fn matches(&mut self, pattern: &PatternRef, expr: &ExprRef) -> bool {
        self.memo.clear();
        self.matched_nodes.clear();
        self.memoize = true;
        let out = self.visit(pattern, expr);
        if !out {
            debug_assert!(self.memo.is_empty());
            debug_assert!(self.matched_nodes.is_empty());
        }
        out
    }

    /// Expression captured by `pattern` in the last successful match.
    pub fn matched(&self, pattern: &PatternRef) -> Option<&ExprRef> {
        self.memo.get(&pattern.id()).map(|bound| &bound[0])
    }

    pub(crate) fn memo_len(&self) -> usize {
        self.memo.len()
    }

    pub(crate) fn matched_nodes_len(&self) -> usize {
        self.matched_nodes.len()
    }

    fn rollback(&mut self, watermark: usize) {
        for id in self.matched_nodes.drain(watermark..) {
            self.memo.remove(&id);
        }
    }

    fn visit(&mut self, pattern: &PatternRef, expr: &ExprRef) -> bool {
        let expr = self.autojump_target(pattern, expr);
        if self.memoize
            && let Some(bound) = self.memo.get(&pattern.id())
        {
            assert_eq!(bound.len(), 1, "pattern memoized with more than one expression");
            return bound[0].same_as(&expr);
        }
        let watermark = self.matched_nodes.len();
        let out = self.visit_kind(pattern, &expr);
        tracing::trace!(pattern = pattern.id(), expr = expr.id(), matched = out, "visit");
        if out {
            self.memo.entry(pattern.id()).or_default().push(expr);
            self.matched_nodes.push(pattern.id());
        } else {
            self.rollback(watermark);
        }
        out
    }

    /// Step one of every visit: substitute a variable by its bound value.
    /// Variable patterns are about the variable itself, and shape/dtype
    /// constraints read accessors that are variable-safe, so those variants
    /// opt out.
    fn autojump_target(&self, pattern: &PatternRef, expr: &ExprRef) -> ExprRef {
        if self.autojump
            && !matches!(
                pattern.kind(),
                PatternKind::Var { .. }
                    | PatternKind::DataflowVar { .. }
                    | PatternKind::GlobalVar { .. }
                    | PatternKind::Shape { .. }
                    | PatternKind::DataType { .. }
            )
            && expr.is_var_like()
            && let Some(value) = self.var2val.get(&expr.id())
        {
            return value.clone();
        }
        expr.clone()
    }

    fn visit_kind(&mut self, pattern: &PatternRef, expr: &ExprRef) -> bool {
        match pattern.kind() {
            PatternKind::Wildcard => true,

            PatternKind::ExprLiteral { expr: literal } => structural_equal(literal, expr),

            PatternKind::Var { name_hint } => match expr.kind() {
                ExprKind::Var { name_hint: name } | ExprKind::DataflowVar { name_hint: name } => {
                    name_hint.is_empty() || name_hint == name
                }
                _ => false,
            },

            PatternKind::DataflowVar { name_hint } => match expr.kind() {
                ExprKind::DataflowVar { name_hint: name } => {
                    name_hint.is_empty() || name_hint == name
                }
                _ => false,
            },

            PatternKind::GlobalVar { name_hint } => match expr.kind() {
                ExprKind::GlobalVar { name } => name_hint.is_empty() || name_hint == name,
                _ => false,
            },

            PatternKind::ExternFunc { symbol } => match expr.kind() {
                ExprKind::ExternFunc { symbol: name } => symbol.is_empty() || symbol == name,
                _ => false,
            },

            PatternKind::Constant => matches!(expr.kind(), ExprKind::Constant { .. }),

            PatternKind::RuntimeDepShape => {
                matches!(expr.shape().map(|s| s.kind()), Some(ExprKind::RuntimeDepShape))
            }

            PatternKind::Tuple { fields } => match expr.kind() {
                ExprKind::Tuple { fields: expr_fields } => match fields {
                    None => true,
                    Some(fields) => {
                        fields.len() == expr_fields.len()
                            && fields.iter().zip(expr_fields).all(|(p, e)| self.visit(p, e))
                    }
                },
                _ => false,
            },

            PatternKind::TupleGetItem { tuple, index } => match expr.kind() {
                ExprKind::TupleGetItem { tuple: expr_tuple, index: expr_index } => {
                    (*index == -1 || index == expr_index) && self.visit(tuple, expr_tuple)
                }
                _ => false,
            },

            PatternKind::Call { .. } => self.match_call(pattern, expr),

            PatternKind::Function { params, body } => match expr.kind() {
                ExprKind::Function { params: expr_params, body: expr_body, .. } => {
                    if let Some(params) = params {
                        if params.len() != expr_params.len() {
                            return false;
                        }
                        if !params.iter().zip(expr_params).all(|(p, e)| self.visit(p, e)) {
                            return false;
                        }
                    }
                    self.visit(body, expr_body)
                }
                _ => false,
            },

            PatternKind::If { cond, then_branch, else_branch } => match expr.kind() {
                ExprKind::If { cond: expr_cond, then_branch: expr_then, else_branch: expr_else } => {
                    self.visit(cond, expr_cond)
                        && self.visit(then_branch, expr_then)
                        && self.visit(else_branch, expr_else)
                }
                _ => false,
            },

            PatternKind::PrimArr { fields } => match expr.kind() {
                ExprKind::ShapeExpr { values } => {
                    fields.len() == values.len()
                        && fields.iter().zip(values).all(|(p, v)| self.analyzer.can_prove_equal(p, v))
                }
                _ => false,
            },

            PatternKind::Attr { .. } => self.match_attr(pattern, expr),

            PatternKind::Type { pattern: inner, ty } => {
                *expr.checked_type() == *ty && self.visit(inner, expr)
            }

            PatternKind::Shape { pattern: inner, shape } => {
                let Some(expr_shape) = expr.shape() else {
                    return false;
                };
                let ExprKind::ShapeExpr { values } = expr_shape.kind() else {
                    return false;
                };
                shape.len() == values.len()
                    && shape.iter().zip(values).all(|(p, v)| self.analyzer.can_prove_equal(p, v))
                    && self.visit(inner, expr)
            }

            PatternKind::DataType { pattern: inner, dtype } => match expr.checked_type() {
                Type::Tensor { dtype: expr_dtype, .. } => {
                    expr_dtype == dtype && self.visit(inner, expr)
                }
                _ => false,
            },

            PatternKind::Alt { left, right } => self.visit(left, expr) || self.visit(right, expr),

            PatternKind::And { left, right } => self.visit(left, expr) && self.visit(right, expr),

            PatternKind::Not { reject } => !self.visit(reject, expr),

            PatternKind::Dominator { .. } => self.match_dominator(pattern, expr),
        }
    }

    // Call matching: exact argument order first, a commutative retry for
    // `add`/`multiply`, and when the operator itself does not match, the
    // divide/multiply reassociations so `(x*y)/z` patterns also recognize
    // `x*(y/z)` shapes and vice versa.
    fn match_call(&mut self, pattern: &PatternRef, expr: &ExprRef) -> bool {
        let PatternKind::Call { op: op_pat, args: pat_args } = pattern.kind() else {
            return false;
        };
        let ExprKind::Call { op: expr_op, args: expr_args, .. } = expr.kind() else {
            return false;
        };

        let watermark = self.matched_nodes.len();
        if self.visit(op_pat, expr_op) {
            let watermark2 = self.matched_nodes.len();
            if self.match_args(pat_args.as_deref(), expr_args, watermark2) {
                return true;
            }
            if let Some(name) = op_pat.op_literal_name()
                && (name == "add" || name == "multiply")
                && let Some(args) = pat_args
            {
                let reversed: Vec<PatternRef> = args.iter().rev().cloned().collect();
                if self.match_args(Some(&reversed), expr_args, watermark2) {
                    return true;
                }
            }
            false
        } else {
            self.rollback(watermark);
            self.try_reassociate(op_pat, pat_args.as_deref(), expr, expr_args, watermark)
        }
    }

    /// Argument-wise matching; arity must agree when the pattern constrains
    /// it. Rolls back to `watermark` on failure.
    fn match_args(
        &mut self,
        pat_args: Option<&[PatternRef]>,
        expr_args: &[ExprRef],
        watermark: usize,
    ) -> bool {
        let mut matches = true;
        if let Some(pats) = pat_args {
            if pats.len() == expr_args.len() {
                for (p, e) in pats.iter().zip(expr_args) {
                    if !self.visit(p, e) {
                        matches = false;
                        break;
                    }
                }
            } else {
                matches = false;
            }
        }
        if !matches {
            self.rollback(watermark);
        }
        matches
    }

    /// Structural reassociation of multiply/divide: synthetic sub-patterns
    /// are built and matched, inputs are never mutated.
    fn try_reassociate(
        &mut self,
        op_pat: &PatternRef,
        pat_args: Option<&[PatternRef]>,
        expr: &ExprRef,
        expr_args: &[ExprRef],
        watermark: usize,
    ) -> bool {
        // divide(multiply(a, b), c) against multiply(x, y) with a divide
        // among the operands: try multiply(b, divide(a, c)) and
        // multiply(a, divide(b, c)).
        if op_pat.op_literal_name() == Some("divide")
            && let Some(pats) = pat_args
            && pats.len() == 2
            && let PatternKind::Call { op: mul_op, args: Some(mul_args) } = pats[0].kind()
            && mul_args.len() == 2
            && mul_op.op_literal_name() == Some("multiply")
            && expr_op_is(expr, "multiply")
            && expr_args.len() == 2
            && (expr_op_is(&expr_args[0], "divide") || expr_op_is(&expr_args[1], "divide"))
        {
            for arg_id in 0..2 {
                let div = op_pat.call(vec![mul_args[arg_id].clone(), pats[1].clone()]);
                let mul = mul_op.call(vec![mul_args[(arg_id + 1) % 2].clone(), div]);
                if self.visit(&mul, expr) {
                    return true;
                }
                self.rollback(watermark);
            }
            return false;
        }
        // multiply(divide(a, b), other) against divide(x, y) with a
        // multiply among the operands: try divide(multiply(a, other), b).
        if op_pat.op_literal_name() == Some("multiply")
            && let Some(pats) = pat_args
            && pats.len() == 2
        {
            for arg_id in 0..2 {
                if let PatternKind::Call { op: div_op, args: Some(div_args) } = pats[arg_id].kind()
                    && div_args.len() == 2
                    && div_op.op_literal_name() == Some("divide")
                    && expr_op_is(expr, "divide")
                    && expr_args.len() == 2
                    && (expr_op_is(&expr_args[0], "multiply") || expr_op_is(&expr_args[1], "multiply"))
                {
                    let mul = op_pat.call(vec![div_args[0].clone(), pats[(arg_id + 1) % 2].clone()]);
                    let div = div_op.call(vec![mul, div_args[1].clone()]);
                    return self.visit(&div, expr);
                }
            }
        }
        false
    }

    // Attribute matching, by expression variant: op expressions go through
    // the registered op-attribute maps, calls through their attrs object,
    // functions through their attrs dict with structural equality.
    fn match_attr(&mut self, pattern: &PatternRef, expr: &ExprRef) -> bool {
        let PatternKind::Attr { pattern: inner, attrs: pat_attrs } = pattern.kind() else {
            return false;
        };
        if !self.visit(inner, expr) {
            return false;
        }
        tracing::debug!(expr = expr.id(), "considering attribute pattern");
        match expr.kind() {
            ExprKind::Op { name } => pat_attrs.iter().all(|(attr_name, attr_value)| {
                attrs::has_attr_map(attr_name)
                    && match attrs::op_attr(attr_name, name) {
                        Some(registered) => match_retvalue(attr_value, &registered),
                        None => false,
                    }
            }),
            ExprKind::Call { attrs: call_attrs, .. } => {
                pat_attrs.iter().all(|(name, value)| match call_attrs.get(name) {
                    Some(actual) => match_retvalue(value, actual),
                    None => false,
                })
            }
            ExprKind::Function { attrs: fn_attrs, .. } => {
                pat_attrs.iter().all(|(name, value)| match fn_attrs.get(name) {
                    Some(actual) => attr_value_structural_eq(value, actual),
                    None => false,
                })
            }
            _ => false,
        }
    }

    // Dominator matching is two-phase: a non-committing walk over the
    // inputs establishes that the intermediate structure is allowed, then a
    // committing DFS over the dominator children finds a genuine parent.
    fn match_dominator(&mut self, pattern: &PatternRef, expr: &ExprRef) -> bool {
        let PatternKind::Dominator { child, path, parent } = pattern.kind() else {
            return false;
        };
        if self.visit(child, expr) {
            let matches_path = self.matches_path(path, parent, expr);
            self.memoize = true;
            if matches_path {
                return self.dominates_parent(parent, expr);
            }
        }
        false
    }

    /// Every input of `expr` (the call operator aside) either matches
    /// `parent` outright, which proves the whole subtree, or matches `path`
    /// and recursively satisfies the same condition. Exploration runs with
    /// memoization off; only `parent` attempts commit.
    fn matches_path(&mut self, path: &PatternRef, parent: &PatternRef, expr: &ExprRef) -> bool {
        let call_op = match expr.kind() {
            ExprKind::Call { op, .. } => Some(op.clone()),
            _ => None,
        };
        for node in self.graph.inputs(expr) {
            if let Some(op) = &call_op
                && node.same_as(op)
            {
                continue;
            }
            self.memoize = true;
            if self.visit(parent, &node) {
                return true;
            }
            self.memoize = false;
            if !self.visit(path, &node) || !self.matches_path(path, parent, &node) {
                return false;
            }
        }
        true
    }

    /// Iterative DFS over the dominator children of `expr`, looking for a
    /// node that matches `parent`.
    fn dominates_parent(&mut self, parent: &PatternRef, expr: &ExprRef) -> bool {
        let mut stack: Vec<ExprRef> = vec![expr.clone()];
        let mut visited: HashSet<u64> = HashSet::new();
        while let Some(current) = stack.pop() {
            for node in self.graph.dominator_children(&current) {
                if visited.insert(node.id()) {
                    if self.visit(parent, &node) {
                        return true;
                    }
                    stack.push(node);
                }
            }
        }
        false
    }
}

/// Whether `expr` is a call to the operator primitive `name`.
fn expr_op_is(expr: &ExprRef, name: &str) -> bool {
    match expr.kind() {
        ExprKind::Call { op, .. } => op.op_name() == Some(name),
        _ => false,
    }
}
