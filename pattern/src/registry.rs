//! Entry-point registry for the scripting front-end.
//!
//! The matcher entries are exposed under stable symbolic names so a
//! scripting shim can look them up without linking against the concrete
//! functions. The table is process-wide; the entries themselves are plain
//! function pointers and are registered at first access.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use rill_ir::block::Var2Val;
use rill_ir::expr::ExprRef;

use crate::matcher::{match_expr_pattern, match_pattern};
use crate::pat::PatternRef;

/// Stable name of the non-auto-jump entry.
pub const MATCH_PATTERN: &str = "relax.dataflow_pattern.match";
/// Stable name of the auto-jump entry.
pub const MATCH_EXPR_PATTERN: &str = "relax.dataflow_pattern.match_expr";

/// Uniform signature of registered entries; entries that do not auto-jump
/// ignore the third argument.
pub type EntryFn = fn(&PatternRef, &ExprRef, Option<&Var2Val>) -> bool;

static REGISTRY: Lazy<RwLock<HashMap<&'static str, EntryFn>>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, EntryFn> = HashMap::new();
    table.insert(MATCH_PATTERN, |pattern, expr, _| match_pattern(pattern, expr));
    table.insert(MATCH_EXPR_PATTERN, |pattern, expr, var2val| {
        match_expr_pattern(pattern, expr, var2val)
    });
    RwLock::new(table)
});

/// Register (or replace) an entry under `name`.
pub fn register(name: &'static str, entry: EntryFn) {
    REGISTRY.write().insert(name, entry);
}

/// Whether an entry is registered under `name`.
pub fn registered(name: &str) -> bool {
    REGISTRY.read().contains_key(name)
}

/// Look up the entry registered under `name`.
pub fn get(name: &str) -> Option<EntryFn> {
    REGISTRY.read().get(name).copied()
}
