//! Attribute dictionaries and the op-attribute registry.
//!
//! Calls and functions carry an [`Attrs`] dictionary; operator primitives
//! get their attributes from a process-level registry of named maps
//! (`"TOpPattern"` and friends), keyed by op name. [`match_retvalue`] is
//! the kind-wise comparison the attribute pattern applies between a
//! pattern-side literal and a runtime attribute value.

use std::cell::RefCell;
use std::collections::HashMap;

use rill_dtype::DType;

use crate::expr::ExprRef;
use crate::structural::structural_equal_with;

#[derive(Debug, Clone)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
    DType(DType),
    /// Arbitrary IR object, compared structurally.
    Expr(ExprRef),
}

/// Ordered name/value dictionary.
#[derive(Debug, Clone, Default)]
pub struct Attrs {
    entries: Vec<(String, AttrValue)>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion; later entries win on duplicate names.
    pub fn with(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttrValue) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Kind-wise comparison between a pattern attribute literal (`lhs`) and a
/// runtime-tagged attribute value (`rhs`).
///
/// Integers and floats compare by value, strings and dtypes by canonical
/// string content on either side, and arbitrary objects by structural
/// equality without free-variable mapping. Kind mismatches never match.
pub fn match_retvalue(lhs: &AttrValue, rhs: &AttrValue) -> bool {
    match rhs {
        AttrValue::Int(r) => matches!(lhs, AttrValue::Int(l) if l == r),
        AttrValue::Float(r) => matches!(lhs, AttrValue::Float(l) if l == r),
        AttrValue::Str(r) => match lhs {
            AttrValue::Str(l) => l == r,
            AttrValue::DType(l) => l.name() == r,
            _ => false,
        },
        AttrValue::DType(r) => match lhs {
            AttrValue::Str(l) => l == r.name(),
            AttrValue::DType(l) => l == r,
            _ => false,
        },
        AttrValue::Expr(r) => match lhs {
            AttrValue::Expr(l) => structural_equal_with(l, r, false),
            _ => false,
        },
    }
}

/// Same-kind structural equality, used for function attribute dictionaries.
pub fn attr_value_structural_eq(lhs: &AttrValue, rhs: &AttrValue) -> bool {
    match (lhs, rhs) {
        (AttrValue::Int(l), AttrValue::Int(r)) => l == r,
        (AttrValue::Float(l), AttrValue::Float(r)) => l == r,
        (AttrValue::Str(l), AttrValue::Str(r)) => l == r,
        (AttrValue::DType(l), AttrValue::DType(r)) => l == r,
        (AttrValue::Expr(l), AttrValue::Expr(r)) => structural_equal_with(l, r, false),
        _ => false,
    }
}

// Registry of named op-attribute maps.
//
// Thread-local, like the other process-level caches of this workspace: the
// IR is single-threaded by construction, and per-thread registries give
// test isolation for free.
thread_local! {
    static OP_ATTR_MAPS: RefCell<HashMap<String, HashMap<String, AttrValue>>> =
        RefCell::new(HashMap::new());
}

/// Register `value` under attribute map `map_name` for operator `op_name`.
pub fn register_op_attr(
    map_name: impl Into<String>,
    op_name: impl Into<String>,
    value: AttrValue,
) {
    OP_ATTR_MAPS.with(|maps| {
        maps.borrow_mut()
            .entry(map_name.into())
            .or_default()
            .insert(op_name.into(), value);
    });
}

/// Whether an attribute map with this name exists.
pub fn has_attr_map(name: &str) -> bool {
    OP_ATTR_MAPS.with(|maps| maps.borrow().contains_key(name))
}

/// Value registered for `op_name` under `map_name`, if any.
pub fn op_attr(map_name: &str, op_name: &str) -> Option<AttrValue> {
    OP_ATTR_MAPS.with(|maps| maps.borrow().get(map_name).and_then(|m| m.get(op_name)).cloned())
}
