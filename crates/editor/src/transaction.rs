//! Atomic document mutations.

use crate::document::{Node, Selection};

/// A single tree edit, addressed by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Replaces the node at `path` with zero or more nodes.
    Replace {
        /// Path of the node to replace.
        path: Vec<usize>,
        /// Replacement nodes (empty to delete).
        nodes: Vec<Node>,
    },
    /// Inserts a node so that it ends up at `path`.
    Insert {
        /// Path the new node will occupy.
        path: Vec<usize>,
        /// Node to insert.
        node: Node,
    },
}

impl Step {
    /// Path the step addresses.
    pub fn path(&self) -> &[usize] {
        match self {
            Step::Replace { path, .. } | Step::Insert { path, .. } => path,
        }
    }
}

/// Ordered steps plus the selection to set once they are applied.
///
/// Steps run in order against the tree as left by the previous step, so a
/// later step must account for index shifts caused by an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    steps: Vec<Step>,
    selection: Option<Selection>,
}

impl Transaction {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a replace step.
    pub fn replace(mut self, path: Vec<usize>, nodes: Vec<Node>) -> Self {
        self.steps.push(Step::Replace { path, nodes });
        self
    }

    /// Adds a delete step.
    pub fn delete(self, path: Vec<usize>) -> Self {
        self.replace(path, Vec::new())
    }

    /// Adds an insert step.
    pub fn insert(mut self, path: Vec<usize>, node: Node) -> Self {
        self.steps.push(Step::Insert { path, node });
        self
    }

    /// Sets the selection to apply after the steps.
    pub fn select(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Steps in application order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Selection to set after the steps, if any.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Whether the transaction changes nothing.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.selection.is_none()
    }
}
