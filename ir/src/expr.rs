//! Expression nodes.
//!
//! [`Expr`] is a tagged tree node with a stable identity. Nodes are built
//! through the constructor functions and shared via [`ExprRef`]; there is no
//! mutation after construction. Type and shape annotations live in
//! `OnceCell`s so they can be attached by builders (or derived lazily)
//! without making the node mutable.

use std::cell::{Cell, OnceCell};
use std::rc::Rc;

use smallvec::SmallVec;

use rill_dtype::DType;

use crate::attrs::Attrs;
use crate::block::DataflowBlock;
use crate::prim::PrimExpr;
use crate::ty::Type;

// Thread-local counter for stable expression IDs.
//
// Monotonic and never reused, so identity maps keyed by id are immune to
// the ABA problem that raw pointers would have. Cell keeps the counter
// single-threaded, matching the matcher's execution model.
thread_local! {
    static EXPR_ID_COUNTER: Cell<u64> = const { Cell::new(0) };
}

fn next_expr_id() -> u64 {
    EXPR_ID_COUNTER.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        id
    })
}

/// Shared handle to an expression node.
pub type ExprRef = Rc<Expr>;

/// A node in the expression tree.
#[derive(Debug)]
pub struct Expr {
    id: u64,
    kind: ExprKind,
    /// Checked type annotation; derived structurally on first access when
    /// the builder did not attach one.
    ty: OnceCell<Type>,
    /// Shape annotation: a `ShapeExpr` or `RuntimeDepShape` expression.
    shape: OnceCell<ExprRef>,
}

/// The expression variants.
#[derive(Debug)]
pub enum ExprKind {
    /// Tensor literal. Payload values are irrelevant to matching and are
    /// not modeled; rank and element type are.
    Constant { dtype: DType, dims: Vec<i64> },
    Var { name_hint: String },
    DataflowVar { name_hint: String },
    GlobalVar { name: String },
    ExternFunc { symbol: String },
    /// Operator primitive (`"add"`, `"multiply"`, `"relu"`, ...).
    Op { name: String },
    Tuple { fields: Vec<ExprRef> },
    TupleGetItem { tuple: ExprRef, index: i64 },
    Call { op: ExprRef, args: Vec<ExprRef>, attrs: Attrs },
    Function { params: Vec<ExprRef>, body: ExprRef, attrs: Attrs },
    If { cond: ExprRef, then_branch: ExprRef, else_branch: ExprRef },
    /// Symbolic shape literal.
    ShapeExpr { values: Vec<PrimExpr> },
    /// Marker for shapes only known at runtime.
    RuntimeDepShape,
    /// Sequence of binding blocks followed by a result expression; the body
    /// of functions that carry dataflow blocks.
    SeqExpr { blocks: Vec<DataflowBlock>, body: ExprRef },
}

impl Expr {
    fn make(kind: ExprKind) -> ExprRef {
        Rc::new(Self { id: next_expr_id(), kind, ty: OnceCell::new(), shape: OnceCell::new() })
    }

    /// Stable node identity.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Object identity, independent of structure.
    pub fn same_as(&self, other: &Expr) -> bool {
        self.id == other.id
    }

    /// Direct dataflow inputs, call operator first.
    pub fn children(&self) -> SmallVec<[&ExprRef; 4]> {
        match &self.kind {
            ExprKind::Constant { .. }
            | ExprKind::Var { .. }
            | ExprKind::DataflowVar { .. }
            | ExprKind::GlobalVar { .. }
            | ExprKind::ExternFunc { .. }
            | ExprKind::Op { .. }
            | ExprKind::ShapeExpr { .. }
            | ExprKind::RuntimeDepShape => SmallVec::new(),

            ExprKind::Tuple { fields } => fields.iter().collect(),
            ExprKind::TupleGetItem { tuple, .. } => SmallVec::from_slice(&[tuple]),
            ExprKind::Call { op, args, .. } => {
                let mut children = SmallVec::from_slice(&[op]);
                children.extend(args.iter());
                children
            }
            ExprKind::Function { params, body, .. } => {
                let mut children: SmallVec<[&ExprRef; 4]> = params.iter().collect();
                children.push(body);
                children
            }
            ExprKind::If { cond, then_branch, else_branch } => {
                SmallVec::from_slice(&[cond, then_branch, else_branch])
            }
            ExprKind::SeqExpr { blocks, body } => {
                let mut children: SmallVec<[&ExprRef; 4]> =
                    blocks.iter().flat_map(|b| b.bindings()).map(|b| &b.value).collect();
                children.push(body);
                children
            }
        }
    }

    /// Checked type: the annotation when one was attached, otherwise the
    /// structurally derived type, cached on first access.
    pub fn checked_type(&self) -> &Type {
        self.ty.get_or_init(|| crate::ty::structural_type(self))
    }

    /// Shape annotation. Constants derive a concrete `ShapeExpr` from their
    /// dims; other variants only have a shape when one was attached.
    pub fn shape(&self) -> Option<&ExprRef> {
        if self.shape.get().is_none()
            && let ExprKind::Constant { dims, .. } = &self.kind
        {
            let derived = Expr::shape_expr(dims.iter().map(|d| PrimExpr::int(*d)).collect());
            let _ = self.shape.set(derived);
        }
        self.shape.get()
    }

    /// Attach a checked type. No-op when one is already present.
    pub fn with_type(self: Rc<Self>, ty: Type) -> Rc<Self> {
        let _ = self.ty.set(ty);
        self
    }

    /// Attach a shape annotation. No-op when one is already present.
    pub fn with_shape(self: Rc<Self>, shape: ExprRef) -> Rc<Self> {
        let _ = self.shape.set(shape);
        self
    }

    // Constructors.

    pub fn constant(dtype: DType, dims: Vec<i64>) -> ExprRef {
        Self::make(ExprKind::Constant { dtype, dims })
    }

    pub fn var(name_hint: impl Into<String>) -> ExprRef {
        Self::make(ExprKind::Var { name_hint: name_hint.into() })
    }

    pub fn dataflow_var(name_hint: impl Into<String>) -> ExprRef {
        Self::make(ExprKind::DataflowVar { name_hint: name_hint.into() })
    }

    pub fn global_var(name: impl Into<String>) -> ExprRef {
        Self::make(ExprKind::GlobalVar { name: name.into() })
    }

    pub fn extern_func(symbol: impl Into<String>) -> ExprRef {
        Self::make(ExprKind::ExternFunc { symbol: symbol.into() })
    }

    pub fn op(name: impl Into<String>) -> ExprRef {
        Self::make(ExprKind::Op { name: name.into() })
    }

    pub fn tuple(fields: Vec<ExprRef>) -> ExprRef {
        Self::make(ExprKind::Tuple { fields })
    }

    pub fn tuple_get_item(tuple: ExprRef, index: i64) -> ExprRef {
        Self::make(ExprKind::TupleGetItem { tuple, index })
    }

    pub fn call(op: ExprRef, args: Vec<ExprRef>) -> ExprRef {
        Self::make(ExprKind::Call { op, args, attrs: Attrs::new() })
    }

    pub fn call_with_attrs(op: ExprRef, args: Vec<ExprRef>, attrs: Attrs) -> ExprRef {
        Self::make(ExprKind::Call { op, args, attrs })
    }

    /// `call_op("add", [a, b])` builds `Call(Op("add"), [a, b])`.
    pub fn call_op(name: impl Into<String>, args: Vec<ExprRef>) -> ExprRef {
        Self::call(Self::op(name), args)
    }

    pub fn function(params: Vec<ExprRef>, body: ExprRef) -> ExprRef {
        Self::make(ExprKind::Function { params, body, attrs: Attrs::new() })
    }

    pub fn function_with_attrs(params: Vec<ExprRef>, body: ExprRef, attrs: Attrs) -> ExprRef {
        Self::make(ExprKind::Function { params, body, attrs })
    }

    pub fn if_then_else(cond: ExprRef, then_branch: ExprRef, else_branch: ExprRef) -> ExprRef {
        Self::make(ExprKind::If { cond, then_branch, else_branch })
    }

    pub fn shape_expr(values: Vec<PrimExpr>) -> ExprRef {
        Self::make(ExprKind::ShapeExpr { values })
    }

    pub fn runtime_dep_shape() -> ExprRef {
        Self::make(ExprKind::RuntimeDepShape)
    }

    pub fn seq_expr(blocks: Vec<DataflowBlock>, body: ExprRef) -> ExprRef {
        Self::make(ExprKind::SeqExpr { blocks, body })
    }

    // Predicates used across the matcher and analyses.

    /// True for `Var` and `DataflowVar` nodes.
    pub fn is_var_like(&self) -> bool {
        matches!(self.kind, ExprKind::Var { .. } | ExprKind::DataflowVar { .. })
    }

    /// Name of this node when it is an `Op` primitive.
    pub fn op_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Op { name } => Some(name),
            _ => None,
        }
    }

    /// Name hint of this node when it is a variable.
    pub fn var_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Var { name_hint } | ExprKind::DataflowVar { name_hint } => Some(name_hint),
            _ => None,
        }
    }

    /// Variant name, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Constant { .. } => "Constant",
            ExprKind::Var { .. } => "Var",
            ExprKind::DataflowVar { .. } => "DataflowVar",
            ExprKind::GlobalVar { .. } => "GlobalVar",
            ExprKind::ExternFunc { .. } => "ExternFunc",
            ExprKind::Op { .. } => "Op",
            ExprKind::Tuple { .. } => "Tuple",
            ExprKind::TupleGetItem { .. } => "TupleGetItem",
            ExprKind::Call { .. } => "Call",
            ExprKind::Function { .. } => "Function",
            ExprKind::If { .. } => "If",
            ExprKind::ShapeExpr { .. } => "ShapeExpr",
            ExprKind::RuntimeDepShape => "RuntimeDepShape",
            ExprKind::SeqExpr { .. } => "SeqExpr",
        }
    }
}
