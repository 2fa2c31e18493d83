//! LIFO of node handles mirroring the root-to-current path.

use crate::tree::NodeId;

/// The live root-to-current path used to route incoming chunks.
///
/// The bottom entry is always the synthetic root; the aggregator never
/// pops it, so the stack is never empty in practice.
#[derive(Debug, Clone)]
pub(crate) struct NodeStack {
    entries: Vec<NodeId>,
}

impl NodeStack {
    pub(crate) fn new(root: NodeId) -> Self {
        Self {
            entries: vec![root],
        }
    }

    pub(crate) fn push(&mut self, node: NodeId) {
        self.entries.push(node);
    }

    pub(crate) fn pop(&mut self) -> Option<NodeId> {
        self.entries.pop()
    }

    /// The node currently receiving chunks.
    pub(crate) fn top(&self) -> Option<NodeId> {
        self.entries.last().copied()
    }

    /// Current depth, root included.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
