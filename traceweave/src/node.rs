//! Nodes of the reconstructed execution tree.

use crate::tree::{NodeId, SpanId};

/// Id of the synthetic root node seeded at aggregator construction.
pub const ROOT_ID: &str = "root";
/// Kind of the synthetic root node.
pub const ROOT_KIND: &str = "root";
/// Kind assigned to synthetic sub-agent collaborator nodes.
pub const COLLABORATOR_KIND: &str = "agent-collaborator";

/// One entry in a node's ordered child sequence.
///
/// Nodes own a *mixed* sequence of spans and sub-nodes; modeling the mix as
/// an explicit tagged variant lets every consumer pattern-match
/// exhaustively instead of testing runtime types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    /// A chunk span owned by the node.
    Span(SpanId),
    /// A sub-node spawned directly under the node (outside any span).
    Node(NodeId),
}

/// One logical unit of execution in the reconstructed tree: an agent
/// invocation, an orchestration phase, or a synthetic collaborator node.
///
/// A node owns an ordered, mixed sequence of [`ChunkSpan`]s and child
/// nodes (`children` is the authoritative traversal order), a pointer to
/// the one span currently accepting chunks, and any loose chunks that are
/// never grouped into spans (failure records, collaborator markers).
///
/// [`ChunkSpan`]: crate::ChunkSpan
#[derive(Debug, Clone, PartialEq)]
pub struct TraceNode {
    /// Globally unique id, assigned at creation, immutable.
    id: String,
    /// Node kind: a phase name, [`COLLABORATOR_KIND`], or [`ROOT_KIND`].
    kind: String,
    /// Ordered mixed sequence of spans and sub-nodes.
    children: Vec<Child>,
    /// Parent handle. `None` only for the root.
    parent: Option<NodeId>,
    /// The span currently accepting chunks, if any. Always refers to a
    /// span present in `children`.
    current_span: Option<SpanId>,
    /// Chunks recorded on the node itself rather than inside a span.
    loose_chunks: Vec<serde_json::Value>,
}

impl TraceNode {
    pub(crate) fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            children: Vec::new(),
            parent,
            current_span: None,
            loose_chunks: Vec::new(),
        }
    }

    /// The node's globally unique id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The node's kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The ordered child sequence (spans and sub-nodes interleaved).
    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Handle of the parent node, or `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Handle of the span currently accepting chunks, if any.
    pub fn current_span(&self) -> Option<SpanId> {
        self.current_span
    }

    /// Chunks recorded loose on the node, in arrival order.
    pub fn loose_chunks(&self) -> &[serde_json::Value] {
        &self.loose_chunks
    }

    /// Whether this node accepts nested units without being closed by
    /// sibling promotion (the root and collaborator nodes do).
    pub fn is_pass_through(&self) -> bool {
        self.kind == ROOT_KIND || self.kind == COLLABORATOR_KIND
    }

    /// Append a child. A span child additionally becomes the current span;
    /// a sub-node child leaves the current span untouched.
    pub(crate) fn add_child(&mut self, child: Child) {
        self.children.push(child);
        if let Child::Span(span) = child {
            self.current_span = Some(span);
        }
    }

    /// Record a chunk on the node itself, outside any span.
    pub(crate) fn add_loose_chunk(&mut self, chunk: serde_json::Value) {
        self.loose_chunks.push(chunk);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
