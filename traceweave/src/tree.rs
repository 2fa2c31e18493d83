//! Arena-owned execution tree and its handle types.
//!
//! Every [`TraceNode`] and [`ChunkSpan`] lives in one [`TraceTree`]; the
//! tree hands out copyable index handles instead of references, so parent
//! back-references are just stored ids and never fight the borrow checker.
//! Nothing is ever removed from the arena, so handles stay valid for the
//! tree's lifetime.

use std::collections::HashMap;

use serde_json::{Value, json};

use crate::node::{Child, ROOT_ID, ROOT_KIND, TraceNode};
use crate::span::ChunkSpan;

/// Handle to a [`TraceNode`] inside a [`TraceTree`].
///
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Handle to a [`ChunkSpan`] inside a [`TraceTree`].
///
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(usize);

impl NodeId {
    #[cfg(test)]
    pub(crate) fn for_test(index: usize) -> Self {
        Self(index)
    }
}

impl SpanId {
    #[cfg(test)]
    pub(crate) fn for_test(index: usize) -> Self {
        Self(index)
    }
}

/// The reconstructed execution tree.
///
/// Owns every node and span produced by aggregation. The synthetic root
/// node (id [`ROOT_ID`], kind [`ROOT_KIND`]) is allocated at construction;
/// all other nodes and spans are allocated lazily while chunks are
/// ingested. Partial trees are valid: a stream may stop at any point and
/// the tree read as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceTree {
    nodes: Vec<TraceNode>,
    spans: Vec<ChunkSpan>,
    /// Actual node id (as registered at allocation) to handle.
    index: HashMap<String, NodeId>,
    root: NodeId,
}

impl TraceTree {
    pub(crate) fn new() -> Self {
        let root = NodeId(0);
        let mut index = HashMap::new();
        index.insert(ROOT_ID.to_string(), root);
        Self {
            nodes: vec![TraceNode::new(ROOT_ID, ROOT_KIND, None)],
            spans: Vec::new(),
            index,
            root,
        }
    }

    /// Handle of the synthetic root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read a node by handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different tree.
    pub fn node(&self, id: NodeId) -> &TraceNode {
        &self.nodes[id.0]
    }

    /// Read a span by handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different tree.
    pub fn span(&self, id: SpanId) -> &ChunkSpan {
        &self.spans[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut TraceNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn span_mut(&mut self, id: SpanId) -> &mut ChunkSpan {
        &mut self.spans[id.0]
    }

    pub(crate) fn alloc_node(
        &mut self,
        id: impl Into<String>,
        kind: impl Into<String>,
        parent: NodeId,
    ) -> NodeId {
        let id = id.into();
        let handle = NodeId(self.nodes.len());
        self.index.insert(id.clone(), handle);
        self.nodes.push(TraceNode::new(id, kind, Some(parent)));
        handle
    }

    pub(crate) fn alloc_span(&mut self, kind: &str, parent: NodeId) -> SpanId {
        let handle = SpanId(self.spans.len());
        self.spans.push(ChunkSpan::new(kind, parent));
        handle
    }

    /// Look up a node by its registered id.
    ///
    /// Collaborator nodes register under their synthetic `…-agent` id. The
    /// index is part of the tree, so lookup keeps working after the
    /// aggregator is consumed.
    pub fn lookup(&self, id: &str) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    /// Total number of nodes, the synthetic root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of spans across the whole tree.
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Total number of chunks held anywhere in the tree, spanned and loose.
    pub fn chunk_count(&self) -> usize {
        let spanned: usize = self.spans.iter().map(|s| s.chunks().len()).sum();
        let loose: usize = self.nodes.iter().map(|n| n.loose_chunks().len()).sum();
        spanned + loose
    }

    /// Direct child nodes of `id` in authoritative order.
    ///
    /// Spans in the child sequence contribute their nested nodes at the
    /// span's position.
    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for child in self.node(id).children() {
            match child {
                Child::Node(node) => out.push(*node),
                Child::Span(span) => out.extend_from_slice(self.span(*span).child_nodes()),
            }
        }
        out
    }

    /// All nodes below `id` in depth-first pre-order, `id` excluded.
    ///
    /// Nesting depth is stream-controlled, so the walk carries its own
    /// worklist instead of recursing.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = self.child_nodes(id);
        pending.reverse();
        while let Some(node) = pending.pop() {
            out.push(node);
            pending.extend(self.child_nodes(node).into_iter().rev());
        }
        out
    }

    /// Plain JSON snapshot of the whole tree, for debugging and golden
    /// assertions. Spans appear in their parent's child sequence with
    /// their chunks and nested nodes inline.
    ///
    /// Like [`descendants`](Self::descendants), assembly is iterative:
    /// values are built in reverse pre-order, every child before its
    /// parent, whatever the nesting depth.
    pub fn to_value(&self) -> Value {
        let mut order = vec![self.root];
        order.extend(self.descendants(self.root));

        let mut built: HashMap<NodeId, Value> = HashMap::with_capacity(order.len());
        for id in order.into_iter().rev() {
            let value = self.node_value(id, &mut built);
            built.insert(id, value);
        }
        built.remove(&self.root).unwrap_or(Value::Null)
    }

    /// Assemble one node's value, consuming its children's already-built
    /// values from `built`.
    fn node_value(&self, id: NodeId, built: &mut HashMap<NodeId, Value>) -> Value {
        let node = self.node(id);
        let children: Vec<Value> = node
            .children()
            .iter()
            .map(|child| match child {
                Child::Span(span) => {
                    let span = self.span(*span);
                    let nodes: Vec<Value> = span
                        .child_nodes()
                        .iter()
                        .map(|n| built.remove(n).unwrap_or(Value::Null))
                        .collect();
                    json!({
                        "type": "span",
                        "kind": span.kind(),
                        "chunks": span.chunks(),
                        "nodes": nodes,
                    })
                }
                Child::Node(node) => built.remove(node).unwrap_or(Value::Null),
            })
            .collect();
        json!({
            "type": "node",
            "id": node.id(),
            "kind": node.kind(),
            "loose_chunks": node.loose_chunks(),
            "children": children,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
