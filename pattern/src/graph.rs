//! Derived expression graph: dataflow inputs and dominator children.
//!
//! For a root expression, the graph records every reachable node in
//! post-order, each node's direct inputs (call operator included), and the
//! dominator tree induced by the use relation: a node's dominator parent is
//! the least common ancestor of its users, so the dominator children of a
//! node are exactly the nodes whose every use flows through it. The
//! dominator pattern walks both relations.

use std::collections::{HashMap, HashSet};

use rill_ir::expr::ExprRef;

pub struct ExprGraph {
    nodes: Vec<Node>,
    index_of: HashMap<u64, usize>,
}

struct Node {
    expr: ExprRef,
    inputs: Vec<ExprRef>,
    outputs: Vec<usize>,
    dominator_parent: Option<usize>,
    dominator_children: Vec<usize>,
}

impl ExprGraph {
    pub fn new(root: &ExprRef) -> Self {
        let order = postorder(root);
        let index_of: HashMap<u64, usize> =
            order.iter().enumerate().map(|(i, e)| (e.id(), i)).collect();

        let mut nodes: Vec<Node> = order
            .into_iter()
            .map(|expr| {
                let inputs = expr.children().into_iter().cloned().collect();
                Node { expr, inputs, outputs: Vec::new(), dominator_parent: None, dominator_children: Vec::new() }
            })
            .collect();

        for index in 0..nodes.len() {
            let input_indices: Vec<usize> =
                nodes[index].inputs.iter().map(|input| index_of[&input.id()]).collect();
            for input_index in input_indices {
                nodes[input_index].outputs.push(index);
            }
        }

        // Dominator parents, root first: every output has a higher index,
        // so its own parent link is already in place when we need it.
        for index in (0..nodes.len()).rev() {
            let outputs = nodes[index].outputs.clone();
            let parent = outputs
                .into_iter()
                .map(Some)
                .reduce(|a, b| match (a, b) {
                    (Some(a), Some(b)) => lca(&nodes, a, b),
                    _ => None,
                })
                .flatten();
            nodes[index].dominator_parent = parent;
            if let Some(parent) = parent {
                nodes[parent].dominator_children.push(index);
            }
        }

        Self { nodes, index_of }
    }

    pub fn contains(&self, expr: &ExprRef) -> bool {
        self.index_of.contains_key(&expr.id())
    }

    /// Direct inputs of `expr`; empty when the node is not part of the
    /// graph.
    pub fn inputs(&self, expr: &ExprRef) -> Vec<ExprRef> {
        match self.index_of.get(&expr.id()) {
            Some(&index) => self.nodes[index].inputs.clone(),
            None => Vec::new(),
        }
    }

    /// Nodes immediately dominated by `expr`; empty when the node is not
    /// part of the graph.
    pub fn dominator_children(&self, expr: &ExprRef) -> Vec<ExprRef> {
        match self.index_of.get(&expr.id()) {
            Some(&index) => self.nodes[index]
                .dominator_children
                .iter()
                .map(|&child| self.nodes[child].expr.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Walk both nodes toward the root until the paths meet. Parents always
/// have higher post-order indices, so advancing the smaller index is what
/// moves up.
fn lca(nodes: &[Node], mut a: usize, mut b: usize) -> Option<usize> {
    loop {
        if a == b {
            return Some(a);
        }
        if a < b {
            a = nodes[a].dominator_parent?;
        } else {
            b = nodes[b].dominator_parent?;
        }
    }
}

/// Iterative post-order traversal; every child precedes its users.
fn postorder(root: &ExprRef) -> Vec<ExprRef> {
    let mut visited: HashSet<u64> = HashSet::new();
    let mut result = Vec::new();
    let mut stack = vec![(root.clone(), false)];

    while let Some((node, processed)) = stack.pop() {
        if visited.contains(&node.id()) {
            continue;
        }
        if processed {
            visited.insert(node.id());
            result.push(node);
        } else {
            stack.push((node.clone(), true));
            let children: Vec<ExprRef> = node
                .children()
                .into_iter()
                .filter(|child| !visited.contains(&child.id()))
                .cloned()
                .collect();
            for child in children.into_iter().rev() {
                stack.push((child, false));
            }
        }
    }

    result
}
