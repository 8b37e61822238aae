//! Binding blocks, modules, and variable analyses.
//!
//! A [`DataflowBlock`] is an ordered list of variable bindings; functions
//! hold blocks through `SeqExpr` bodies, and an [`IRModule`] maps global
//! function names to function expressions. The analyses here feed the
//! auto-jumping matcher ([`var_to_value`]) and the statement rewriter
//! ([`var_to_users`], [`free_vars`], [`substitute`]).

use std::collections::{BTreeMap, HashMap, HashSet};

use snafu::ensure;

use crate::error::{DuplicateFunctionSnafu, NotAFunctionSnafu, NotAVariableSnafu, Result};
use crate::expr::{Expr, ExprKind, ExprRef};

/// A single `var = value` statement.
#[derive(Debug, Clone)]
pub struct Binding {
    pub var: ExprRef,
    pub value: ExprRef,
}

impl Binding {
    pub fn new(var: ExprRef, value: ExprRef) -> Result<Self> {
        ensure!(var.is_var_like(), NotAVariableSnafu { kind: var.kind_name() });
        Ok(Self { var, value })
    }
}

/// An ordered sequence of bindings with dataflow (SSA-like) semantics.
#[derive(Debug, Clone, Default)]
pub struct DataflowBlock {
    bindings: Vec<Binding>,
}

impl DataflowBlock {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut Vec<Binding> {
        &mut self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Module of named global functions.
#[derive(Debug, Clone, Default)]
pub struct IRModule {
    functions: BTreeMap<String, ExprRef>,
}

impl IRModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, func: ExprRef) -> Result<()> {
        let name = name.into();
        ensure!(
            matches!(func.kind(), ExprKind::Function { .. }),
            NotAFunctionSnafu { name: name.clone(), kind: func.kind_name() }
        );
        ensure!(!self.functions.contains_key(&name), DuplicateFunctionSnafu { name });
        self.functions.insert(name, func);
        Ok(())
    }

    /// Insert or overwrite.
    pub fn update(&mut self, name: impl Into<String>, func: ExprRef) -> Result<()> {
        let name = name.into();
        ensure!(
            matches!(func.kind(), ExprKind::Function { .. }),
            NotAFunctionSnafu { name: name.clone(), kind: func.kind_name() }
        );
        self.functions.insert(name, func);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&ExprRef> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &ExprRef)> {
        self.functions.iter().map(|(n, f)| (n.as_str(), f))
    }
}

/// Map from variable id to the expression bound to it.
pub type Var2Val = HashMap<u64, ExprRef>;

/// Binding map of a block, keyed by variable identity. This is the
/// `var2val` input of the auto-jumping matcher entry.
pub fn var_to_value(block: &DataflowBlock) -> Var2Val {
    block.bindings().iter().map(|b| (b.var.id(), b.value.clone())).collect()
}

/// Inverse use map of a block: for every variable defined in the block, the
/// binding variables whose right-hand sides mention it. Uses from outside
/// the block (the function result) are not recorded here.
pub fn var_to_users(block: &DataflowBlock) -> HashMap<u64, Vec<ExprRef>> {
    let mut users: HashMap<u64, Vec<ExprRef>> =
        block.bindings().iter().map(|b| (b.var.id(), Vec::new())).collect();
    for binding in block.bindings() {
        for used in free_vars(&binding.value) {
            if let Some(list) = users.get_mut(&used.id()) {
                list.push(binding.var.clone());
            }
        }
    }
    users
}

/// Free variables of `expr` in first-use order, deduplicated. Function
/// parameters and block binding targets are bound within their scope.
pub fn free_vars(expr: &ExprRef) -> Vec<ExprRef> {
    let mut bound = HashSet::new();
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    collect_free_vars(expr, &mut bound, &mut seen, &mut out);
    out
}

fn collect_free_vars(
    expr: &ExprRef,
    bound: &mut HashSet<u64>,
    seen: &mut HashSet<u64>,
    out: &mut Vec<ExprRef>,
) {
    match expr.kind() {
        ExprKind::Var { .. } | ExprKind::DataflowVar { .. } => {
            if !bound.contains(&expr.id()) && seen.insert(expr.id()) {
                out.push(expr.clone());
            }
        }
        ExprKind::Function { params, body, .. } => {
            for param in params {
                bound.insert(param.id());
            }
            collect_free_vars(body, bound, seen, out);
            for param in params {
                bound.remove(&param.id());
            }
        }
        ExprKind::SeqExpr { blocks, body } => {
            let mut introduced = Vec::new();
            for block in blocks {
                for binding in block.bindings() {
                    collect_free_vars(&binding.value, bound, seen, out);
                    if bound.insert(binding.var.id()) {
                        introduced.push(binding.var.id());
                    }
                }
            }
            collect_free_vars(body, bound, seen, out);
            for id in introduced {
                bound.remove(&id);
            }
        }
        _ => {
            for child in expr.children() {
                collect_free_vars(child, bound, seen, out);
            }
        }
    }
}

/// Rebuild `expr` with every variable in `replacements` swapped for its
/// image. Unchanged subtrees are shared, not copied.
pub fn substitute(expr: &ExprRef, replacements: &HashMap<u64, ExprRef>) -> ExprRef {
    if replacements.is_empty() {
        return expr.clone();
    }
    match expr.kind() {
        ExprKind::Var { .. } | ExprKind::DataflowVar { .. } => {
            replacements.get(&expr.id()).cloned().unwrap_or_else(|| expr.clone())
        }
        ExprKind::Constant { .. }
        | ExprKind::GlobalVar { .. }
        | ExprKind::ExternFunc { .. }
        | ExprKind::Op { .. }
        | ExprKind::ShapeExpr { .. }
        | ExprKind::RuntimeDepShape => expr.clone(),

        ExprKind::Tuple { fields } => {
            let new_fields: Vec<_> = fields.iter().map(|f| substitute(f, replacements)).collect();
            if unchanged(fields, &new_fields) { expr.clone() } else { Expr::tuple(new_fields) }
        }
        ExprKind::TupleGetItem { tuple, index } => {
            let new_tuple = substitute(tuple, replacements);
            if new_tuple.same_as(tuple) {
                expr.clone()
            } else {
                Expr::tuple_get_item(new_tuple, *index)
            }
        }
        ExprKind::Call { op, args, attrs } => {
            let new_op = substitute(op, replacements);
            let new_args: Vec<_> = args.iter().map(|a| substitute(a, replacements)).collect();
            if new_op.same_as(op) && unchanged(args, &new_args) {
                expr.clone()
            } else {
                Expr::call_with_attrs(new_op, new_args, attrs.clone())
            }
        }
        ExprKind::Function { params, body, attrs } => {
            let new_body = substitute(body, replacements);
            if new_body.same_as(body) {
                expr.clone()
            } else {
                Expr::function_with_attrs(params.clone(), new_body, attrs.clone())
            }
        }
        ExprKind::If { cond, then_branch, else_branch } => {
            let new_cond = substitute(cond, replacements);
            let new_then = substitute(then_branch, replacements);
            let new_else = substitute(else_branch, replacements);
            if new_cond.same_as(cond) && new_then.same_as(then_branch) && new_else.same_as(else_branch) {
                expr.clone()
            } else {
                Expr::if_then_else(new_cond, new_then, new_else)
            }
        }
        ExprKind::SeqExpr { blocks, body } => {
            let mut changed = false;
            let new_blocks: Vec<DataflowBlock> = blocks
                .iter()
                .map(|block| {
                    let new_bindings: Vec<Binding> = block
                        .bindings()
                        .iter()
                        .map(|b| {
                            let new_value = substitute(&b.value, replacements);
                            changed |= !new_value.same_as(&b.value);
                            Binding { var: b.var.clone(), value: new_value }
                        })
                        .collect();
                    DataflowBlock::new(new_bindings)
                })
                .collect();
            let new_body = substitute(body, replacements);
            changed |= !new_body.same_as(body);
            if changed { Expr::seq_expr(new_blocks, new_body) } else { expr.clone() }
        }
    }
}

fn unchanged(old: &[ExprRef], new: &[ExprRef]) -> bool {
    old.iter().zip(new).all(|(a, b)| a.same_as(b))
}
