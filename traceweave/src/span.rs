//! Ordered runs of chunks sharing one step kind.

use crate::tree::NodeId;

/// An ordered run of chunks that share a semantic step kind (for example an
/// input-assembly step or a model-invocation step).
///
/// A span is a leaf container: it owns its chunks directly and may own
/// handles to child [`TraceNode`]s spawned from within it, such as a
/// sub-agent call initiated mid-span. Spans are reachable only through
/// their parent node's child list.
///
/// [`TraceNode`]: crate::TraceNode
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSpan {
    /// Step kind shared by every chunk in this span.
    kind: String,
    /// Chunks in arrival order.
    chunks: Vec<serde_json::Value>,
    /// Nodes spawned while this span was the active span of its parent.
    child_nodes: Vec<NodeId>,
    /// Owning node. Bookkeeping only, never used for traversal ordering.
    parent: NodeId,
}

impl ChunkSpan {
    pub(crate) fn new(kind: impl Into<String>, parent: NodeId) -> Self {
        Self {
            kind: kind.into(),
            chunks: Vec::new(),
            child_nodes: Vec::new(),
            parent,
        }
    }

    /// The step kind shared by every chunk in this span.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The chunks of this span, in arrival order.
    pub fn chunks(&self) -> &[serde_json::Value] {
        &self.chunks
    }

    /// Handles of nodes spawned from within this span, in spawn order.
    pub fn child_nodes(&self) -> &[NodeId] {
        &self.child_nodes
    }

    /// Handle of the node that owns this span.
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Append a chunk. Pure side effect; no validation, no failure mode.
    pub(crate) fn append(&mut self, chunk: serde_json::Value) {
        self.chunks.push(chunk);
    }

    pub(crate) fn push_child_node(&mut self, node: NodeId) {
        self.child_nodes.push(node);
    }
}
