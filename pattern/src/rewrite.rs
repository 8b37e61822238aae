//! Statement rewriter for dataflow blocks.
//!
//! [`DataflowBlockRewrite`] owns a working copy of one dataflow block and
//! its enclosing function. Mutations (use replacement, binding insertion,
//! unused removal) rebuild the function immutably and keep the analyses
//! (use map, output set, used names) in sync by recomputation; the original
//! function is remembered by identity so a whole module can be mutated at
//! the end.

use std::collections::{HashMap, HashSet};

use snafu::ensure;

use rill_ir::block::{Binding, DataflowBlock, IRModule, free_vars, substitute, var_to_users};
use rill_ir::expr::{Expr, ExprKind, ExprRef};

use crate::error::{
    BlockNotInFunctionSnafu, NotARewritableFunctionSnafu, OriginalFunctionNotFoundSnafu, Result,
    VarHasUsersSnafu, VarNotFoundSnafu,
};

pub struct DataflowBlockRewrite {
    /// Working copy of the rewritten block.
    dfb: DataflowBlock,
    /// Working copy of the enclosing function.
    root_fn: ExprRef,
    /// Identity of the function the rewriter was created with.
    original_fn_id: u64,
    /// Position of the block inside the function's SeqExpr body.
    block_index: usize,
    /// Variable id -> binding variables whose definitions use it.
    to_users: HashMap<u64, Vec<ExprRef>>,
    /// Block variables visible outside the block: non-dataflow bindings
    /// plus variables referenced by the rest of the function.
    fn_outputs: HashSet<u64>,
    used_names: HashSet<String>,
    counter: usize,
}

impl DataflowBlockRewrite {
    /// Create a rewriter for `dfb`, which must be one of the blocks of
    /// `root_fn`'s SeqExpr body (identified by its binding variables).
    pub fn new(dfb: &DataflowBlock, root_fn: &ExprRef) -> Result<Self> {
        let blocks = seq_blocks(root_fn)
            .ok_or_else(|| NotARewritableFunctionSnafu { kind: root_fn.kind_name() }.build())?;

        let block_index = blocks
            .iter()
            .position(|candidate| same_binding_vars(candidate, dfb))
            .ok_or_else(|| BlockNotInFunctionSnafu.build())?;

        let mut rewrite = Self {
            dfb: dfb.clone(),
            root_fn: root_fn.clone(),
            original_fn_id: root_fn.id(),
            block_index,
            to_users: HashMap::new(),
            fn_outputs: HashSet::new(),
            used_names: HashSet::new(),
            counter: 0,
        };
        rewrite.refresh();
        Ok(rewrite)
    }

    /// The rewritten dataflow block.
    pub fn mutated_dataflow_block(&self) -> DataflowBlock {
        self.dfb.clone()
    }

    /// The rewritten function.
    pub fn mutated_func(&self) -> ExprRef {
        self.root_fn.clone()
    }

    /// Clone of `module` with the original function replaced by the
    /// rewritten one.
    pub fn mutate_irmodule(&self, module: &IRModule) -> Result<IRModule> {
        let name = module
            .functions()
            .find(|(_, func)| func.id() == self.original_fn_id)
            .map(|(name, _)| name.to_string());
        let name = name.ok_or_else(|| OriginalFunctionNotFoundSnafu.build())?;

        let mut mutated = module.clone();
        mutated.update(name, self.root_fn.clone()).expect("rewritten root is a function");
        Ok(mutated)
    }

    /// Replace every use of `old_var` inside the function with `new_var`.
    /// The definition of `old_var` is left in place.
    pub fn replace_all_uses(&mut self, old_var: &ExprRef, new_var: &ExprRef) -> Result<()> {
        ensure!(
            self.to_users.contains_key(&old_var.id()),
            VarNotFoundSnafu { name: display_name(old_var) }
        );
        tracing::debug!(old = old_var.id(), new = new_var.id(), "replace all uses");

        let mut replacements = HashMap::new();
        replacements.insert(old_var.id(), new_var.clone());
        self.root_fn = substitute(&self.root_fn, &replacements);
        self.sync_block_from_fn();
        self.refresh();
        Ok(())
    }

    /// Append a binding statement.
    pub fn add_binding(&mut self, binding: Binding) {
        self.dfb.bindings_mut().push(binding);
        self.rebuild_fn_from_block();
        self.refresh();
    }

    /// Bind `value` to a new named variable; returns the variable. The
    /// variable inherits the value's checked type and shape.
    pub fn add(&mut self, name: impl Into<String>, value: ExprRef, is_dfvar: bool) -> ExprRef {
        let name = name.into();
        let var = if is_dfvar { Expr::dataflow_var(&name) } else { Expr::var(&name) };
        let mut var = var.with_type(value.checked_type().clone());
        if let Some(shape) = value.shape() {
            var = var.with_shape(shape.clone());
        }
        self.add_binding(Binding { var: var.clone(), value });
        var
    }

    /// Bind `value` to a fresh automatically named variable.
    pub fn add_fresh(&mut self, value: ExprRef, is_dfvar: bool) -> ExprRef {
        let name = self.make_new_varname();
        self.add(name, value, is_dfvar)
    }

    /// Remove the definition of `unused`. Fails while the variable still
    /// has users inside the block or is visible outside it.
    pub fn remove_unused(&mut self, unused: &ExprRef) -> Result<()> {
        let users = self
            .to_users
            .get(&unused.id())
            .ok_or_else(|| VarNotFoundSnafu { name: display_name(unused) }.build())?;
        let count = users.len() + usize::from(self.fn_outputs.contains(&unused.id()));
        ensure!(count == 0, VarHasUsersSnafu { name: display_name(unused), count });

        self.dfb.bindings_mut().retain(|b| b.var.id() != unused.id());
        self.rebuild_fn_from_block();
        self.refresh();
        Ok(())
    }

    /// Drop every binding that does not transitively contribute to the
    /// block's outputs.
    pub fn remove_all_unused(&mut self) {
        let values: HashMap<u64, ExprRef> =
            self.dfb.bindings().iter().map(|b| (b.var.id(), b.value.clone())).collect();

        let mut needed: HashSet<u64> = HashSet::new();
        let mut worklist: Vec<u64> =
            self.fn_outputs.iter().copied().filter(|id| values.contains_key(id)).collect();
        while let Some(id) = worklist.pop() {
            if !needed.insert(id) {
                continue;
            }
            for used in free_vars(&values[&id]) {
                if values.contains_key(&used.id()) && !needed.contains(&used.id()) {
                    worklist.push(used.id());
                }
            }
        }

        self.dfb.bindings_mut().retain(|b| needed.contains(&b.var.id()));
        self.rebuild_fn_from_block();
        self.refresh();
    }

    /// Fresh variable name, avoiding every name already present in the
    /// function.
    fn make_new_varname(&mut self) -> String {
        loop {
            let name = format!("tmp{}", self.counter);
            self.counter += 1;
            if !self.used_names.contains(&name) {
                self.used_names.insert(name.clone());
                return name;
            }
        }
    }

    /// Re-insert the working block into the function body.
    fn rebuild_fn_from_block(&mut self) {
        let ExprKind::Function { params, body, attrs } = self.root_fn.kind() else {
            unreachable!("validated at construction");
        };
        let ExprKind::SeqExpr { blocks, body: seq_body } = body.kind() else {
            unreachable!("validated at construction");
        };
        let params = params.clone();
        let attrs = attrs.clone();
        let seq_body = seq_body.clone();
        let mut new_blocks = blocks.clone();
        new_blocks[self.block_index] = self.dfb.clone();
        let new_body = Expr::seq_expr(new_blocks, seq_body);
        self.root_fn = Expr::function_with_attrs(params, new_body, attrs);
    }

    /// Re-read the working block out of the (just substituted) function.
    fn sync_block_from_fn(&mut self) {
        let blocks = seq_blocks(&self.root_fn).expect("validated at construction");
        self.dfb = blocks[self.block_index].clone();
    }

    /// Recompute the use map, output set, and used names from scratch.
    /// Blocks are small; surgical updates are not worth the bookkeeping.
    fn refresh(&mut self) {
        self.to_users = var_to_users(&self.dfb);

        let defined: HashSet<u64> = self.dfb.bindings().iter().map(|b| b.var.id()).collect();
        let ExprKind::Function { params, body, .. } = self.root_fn.kind() else {
            unreachable!("validated at construction");
        };
        let ExprKind::SeqExpr { blocks, body: seq_body } = body.kind() else {
            unreachable!("validated at construction");
        };

        self.fn_outputs.clear();
        for binding in self.dfb.bindings() {
            if matches!(binding.var.kind(), ExprKind::Var { .. }) {
                self.fn_outputs.insert(binding.var.id());
            }
        }
        for used in free_vars(seq_body) {
            if defined.contains(&used.id()) {
                self.fn_outputs.insert(used.id());
            }
        }
        for (index, block) in blocks.iter().enumerate() {
            if index == self.block_index {
                continue;
            }
            for binding in block.bindings() {
                for used in free_vars(&binding.value) {
                    if defined.contains(&used.id()) {
                        self.fn_outputs.insert(used.id());
                    }
                }
            }
        }

        self.used_names = params.iter().filter_map(|p| p.var_name()).map(String::from).collect();
        for block in blocks {
            for binding in block.bindings() {
                if let Some(name) = binding.var.var_name() {
                    self.used_names.insert(name.to_string());
                }
            }
        }
    }
}

/// The blocks of a function whose body is a SeqExpr.
fn seq_blocks(func: &ExprRef) -> Option<&Vec<DataflowBlock>> {
    let ExprKind::Function { body, .. } = func.kind() else {
        return None;
    };
    match body.kind() {
        ExprKind::SeqExpr { blocks, .. } => Some(blocks),
        _ => None,
    }
}

/// Two blocks are the same definition site when they bind the same
/// variable objects in the same order.
fn same_binding_vars(a: &DataflowBlock, b: &DataflowBlock) -> bool {
    a.bindings().len() == b.bindings().len()
        && a.bindings().iter().zip(b.bindings()).all(|(x, y)| x.var.same_as(&y.var))
}

fn display_name(var: &ExprRef) -> String {
    var.var_name().unwrap_or("<non-var>").to_string()
}
