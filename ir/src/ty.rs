//! Types and the type oracle.
//!
//! [`infer_type`] is the pure oracle consumed by type, shape, and dtype
//! patterns: explicit annotations attached by builders win, and everything
//! else is derived from the expression structure. The derivation is
//! deterministic, so repeated queries always agree.

use rill_dtype::DType;

use crate::expr::{Expr, ExprKind, ExprRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Tensor of known rank and element type. `ndim` of `-1` denotes a
    /// tensor of unknown rank.
    Tensor { ndim: i32, dtype: DType },
    /// Type of shape literals.
    Shape,
    Tuple(Vec<Type>),
    Func { params: Vec<Type>, ret: Box<Type> },
    /// External packed function.
    PackedFunc,
    /// Top type for nodes whose type is not tracked.
    Object,
}

impl Type {
    pub fn tensor(ndim: i32, dtype: DType) -> Type {
        Type::Tensor { ndim, dtype }
    }

    pub fn func(params: Vec<Type>, ret: Type) -> Type {
        Type::Func { params, ret: Box::new(ret) }
    }
}

/// Checked type of `expr`. Pure and deterministic given pure inputs.
pub fn infer_type(expr: &ExprRef) -> &Type {
    expr.checked_type()
}

/// Structural typing rules, used when a node carries no annotation.
pub(crate) fn structural_type(expr: &Expr) -> Type {
    match expr.kind() {
        ExprKind::Constant { dtype, dims } => Type::Tensor { ndim: dims.len() as i32, dtype: *dtype },
        ExprKind::Var { .. } | ExprKind::DataflowVar { .. } | ExprKind::GlobalVar { .. } => Type::Object,
        ExprKind::ExternFunc { .. } => Type::PackedFunc,
        ExprKind::Op { .. } => Type::Object,
        ExprKind::Tuple { fields } => {
            Type::Tuple(fields.iter().map(|f| f.checked_type().clone()).collect())
        }
        ExprKind::TupleGetItem { tuple, index } => match tuple.checked_type() {
            Type::Tuple(fields) => {
                usize::try_from(*index).ok().and_then(|i| fields.get(i)).cloned().unwrap_or(Type::Object)
            }
            _ => Type::Object,
        },
        // Call result types come from annotations; op signatures are not
        // modeled here.
        ExprKind::Call { .. } => Type::Object,
        ExprKind::Function { params, body, .. } => Type::Func {
            params: params.iter().map(|p| p.checked_type().clone()).collect(),
            ret: Box::new(body.checked_type().clone()),
        },
        ExprKind::If { then_branch, .. } => then_branch.checked_type().clone(),
        ExprKind::ShapeExpr { .. } | ExprKind::RuntimeDepShape => Type::Shape,
        ExprKind::SeqExpr { body, .. } => body.checked_type().clone(),
    }
}
