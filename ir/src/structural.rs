//! Deep structural equality over expression trees.
//!
//! Equality is value-based and independent of object identity. Bound
//! variables (function parameters, block binding targets) are mapped
//! positionally; free variables are mapped on first encounter only when
//! `map_free_var` is set, and otherwise must be the same object. Variable
//! name hints never participate. Symbolic shape dimensions compare through
//! the arithmetic analyzer, so `ShapeExpr([n + n])` equals
//! `ShapeExpr([2 * n])`.

use std::collections::HashMap;

use crate::attrs::{AttrValue, Attrs};
use crate::expr::{ExprKind, ExprRef};
use crate::prim::Analyzer;

/// Structural equality without free-variable mapping.
pub fn structural_equal(a: &ExprRef, b: &ExprRef) -> bool {
    structural_equal_with(a, b, false)
}

/// Structural equality; `map_free_var` lets distinct free variables unify
/// positionally.
pub fn structural_equal_with(a: &ExprRef, b: &ExprRef, map_free_var: bool) -> bool {
    Equaler {
        map_free_var,
        mapped: HashMap::new(),
        mapped_rev: HashMap::new(),
        analyzer: Analyzer::new(),
    }
    .expr_eq(a, b)
}

struct Equaler {
    map_free_var: bool,
    /// lhs var id -> rhs var id; kept a bijection via `mapped_rev`.
    mapped: HashMap<u64, u64>,
    mapped_rev: HashMap<u64, u64>,
    analyzer: Analyzer,
}

impl Equaler {
    fn expr_eq(&mut self, a: &ExprRef, b: &ExprRef) -> bool {
        match (a.kind(), b.kind()) {
            (ExprKind::Constant { dtype: da, dims: sa }, ExprKind::Constant { dtype: db, dims: sb }) => {
                da == db && sa == sb
            }
            (ExprKind::Var { .. }, ExprKind::Var { .. })
            | (ExprKind::DataflowVar { .. }, ExprKind::DataflowVar { .. }) => self.var_eq(a, b),
            (ExprKind::GlobalVar { name: na }, ExprKind::GlobalVar { name: nb }) => na == nb,
            (ExprKind::ExternFunc { symbol: sa }, ExprKind::ExternFunc { symbol: sb }) => sa == sb,
            (ExprKind::Op { name: na }, ExprKind::Op { name: nb }) => na == nb,
            (ExprKind::Tuple { fields: fa }, ExprKind::Tuple { fields: fb }) => {
                fa.len() == fb.len() && fa.iter().zip(fb).all(|(x, y)| self.expr_eq(x, y))
            }
            (
                ExprKind::TupleGetItem { tuple: ta, index: ia },
                ExprKind::TupleGetItem { tuple: tb, index: ib },
            ) => ia == ib && self.expr_eq(ta, tb),
            (
                ExprKind::Call { op: oa, args: aa, attrs: ta },
                ExprKind::Call { op: ob, args: ab, attrs: tb },
            ) => {
                self.expr_eq(oa, ob)
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab).all(|(x, y)| self.expr_eq(x, y))
                    && self.attrs_eq(ta, tb)
            }
            (
                ExprKind::Function { params: pa, body: ba, attrs: ta },
                ExprKind::Function { params: pb, body: bb, attrs: tb },
            ) => {
                if pa.len() != pb.len() || !self.attrs_eq(ta, tb) {
                    return false;
                }
                for (x, y) in pa.iter().zip(pb) {
                    self.map_vars(x, y);
                }
                self.expr_eq(ba, bb)
            }
            (
                ExprKind::If { cond: ca, then_branch: ta, else_branch: ea },
                ExprKind::If { cond: cb, then_branch: tb, else_branch: eb },
            ) => self.expr_eq(ca, cb) && self.expr_eq(ta, tb) && self.expr_eq(ea, eb),
            (ExprKind::ShapeExpr { values: va }, ExprKind::ShapeExpr { values: vb }) => {
                va.len() == vb.len()
                    && va.iter().zip(vb).all(|(x, y)| self.analyzer.can_prove_equal(x, y))
            }
            (ExprKind::RuntimeDepShape, ExprKind::RuntimeDepShape) => true,
            (
                ExprKind::SeqExpr { blocks: la, body: ba },
                ExprKind::SeqExpr { blocks: lb, body: bb },
            ) => {
                if la.len() != lb.len() {
                    return false;
                }
                for (block_a, block_b) in la.iter().zip(lb) {
                    if block_a.bindings().len() != block_b.bindings().len() {
                        return false;
                    }
                    for (x, y) in block_a.bindings().iter().zip(block_b.bindings()) {
                        if !self.expr_eq(&x.value, &y.value) {
                            return false;
                        }
                        self.map_vars(&x.var, &y.var);
                    }
                }
                self.expr_eq(ba, bb)
            }
            _ => false,
        }
    }

    fn var_eq(&mut self, a: &ExprRef, b: &ExprRef) -> bool {
        if let Some(mapped) = self.mapped.get(&a.id()) {
            return *mapped == b.id();
        }
        if self.mapped_rev.contains_key(&b.id()) {
            return false;
        }
        if self.map_free_var {
            self.map_vars(a, b);
            true
        } else {
            a.same_as(b)
        }
    }

    fn map_vars(&mut self, a: &ExprRef, b: &ExprRef) {
        self.mapped.insert(a.id(), b.id());
        self.mapped_rev.insert(b.id(), a.id());
    }

    fn attrs_eq(&mut self, a: &Attrs, b: &Attrs) -> bool {
        a.len() == b.len()
            && a.iter().all(|(name, va)| match b.get(name) {
                Some(vb) => self.attr_value_eq(va, vb),
                None => false,
            })
    }

    fn attr_value_eq(&mut self, a: &AttrValue, b: &AttrValue) -> bool {
        match (a, b) {
            (AttrValue::Expr(x), AttrValue::Expr(y)) => self.expr_eq(x, y),
            (AttrValue::Int(x), AttrValue::Int(y)) => x == y,
            (AttrValue::Float(x), AttrValue::Float(y)) => x == y,
            (AttrValue::Str(x), AttrValue::Str(y)) => x == y,
            (AttrValue::DType(x), AttrValue::DType(y)) => x == y,
            _ => false,
        }
    }
}
