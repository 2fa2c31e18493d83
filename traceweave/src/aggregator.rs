//! The chunk-routing orchestrator.
//!
//! [`TraceAggregator::ingest`] is called once per incoming stream fragment,
//! in arrival order, and routes each chunk into the tree: creating nodes,
//! opening and continuing spans, closing units, and stitching sub-agent
//! collaborations back together. It never blocks, performs no I/O, and has
//! no failure path — unrecognized fragments are dropped whole.

use std::collections::HashSet;

use serde_json::Value;

use crate::chunk::{COLLABORATOR_SUFFIX, ChunkMeta, SkipReason, starts_new_span};
use crate::node::{COLLABORATOR_KIND, Child};
use crate::stack::NodeStack;
use crate::tree::{NodeId, TraceTree};

/// Which routing branch one ingested chunk took.
///
/// Purely informational: callers are free to ignore it. The silent-drop
/// contract holds regardless — [`IngestOutcome::Skipped`] is data, not an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new node was created, the synthetic collaborator case included.
    Created {
        /// Handle of the created node.
        node: NodeId,
    },
    /// The chunk continued the node currently on top of the stack.
    Appended {
        /// Handle of the receiving node.
        node: NodeId,
    },
    /// The chunk closed the active node and continued its parent.
    Closed {
        /// Handle of the parent that received the chunk.
        node: NodeId,
    },
    /// A collaborator round-trip completed; the stack was unwound to the
    /// collaborator (or to the root when it was not found).
    Rejoined {
        /// Handle of the node the output chunk was recorded on.
        node: NodeId,
    },
    /// A previously-seen unit resumed at the current stack top.
    Resumed {
        /// Handle of the receiving node.
        node: NodeId,
    },
    /// The chunk was dropped without touching the tree.
    Skipped(SkipReason),
}

impl IngestOutcome {
    /// Handle of the node the chunk landed on, if it was routed at all.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Created { node }
            | Self::Appended { node }
            | Self::Closed { node }
            | Self::Rejoined { node }
            | Self::Resumed { node } => Some(*node),
            Self::Skipped(_) => None,
        }
    }
}

/// Streaming trace aggregator.
///
/// Reconstructs the hierarchical execution tree of one streamed agent
/// invocation from its flat sequence of trace chunks. One aggregator
/// serves one stream: feed every chunk to [`ingest`](Self::ingest) in
/// arrival order, then read the finished (or abandoned) tree with
/// [`tree`](Self::tree) or [`into_tree`](Self::into_tree).
///
/// The aggregator is synchronous and single-threaded by design; it holds
/// no locks and shares nothing.
#[derive(Debug, Clone)]
pub struct TraceAggregator {
    tree: TraceTree,
    stack: NodeStack,
    /// Every id ever registered, derived and actual. For collaborator
    /// nodes the two differ, which is why this is tracked separately
    /// from the tree's id index (actual ids only).
    seen: HashSet<String>,
}

impl TraceAggregator {
    /// Create an aggregator with a fresh tree holding only the synthetic
    /// root. Takes no configuration.
    #[must_use]
    pub fn new() -> Self {
        let tree = TraceTree::new();
        let stack = NodeStack::new(tree.root());
        Self {
            tree,
            stack,
            seen: HashSet::new(),
        }
    }

    /// Route one raw chunk into the tree.
    ///
    /// Dispatches on the current stack top, in priority order:
    ///
    /// 1. unseen id — create a node (popping once first when the chunk
    ///    starts a sibling of the active node rather than a child);
    /// 2. id matches the top, or is the top's `…-agent` collaborator id —
    ///    append, or spawn the nested collaborator on an input marker;
    /// 3. id matches the top's parent — close the active node and append
    ///    into the parent;
    /// 4. seen id with a collaborator-output marker — unwind the stack to
    ///    the collaborator and record the chunk loose there;
    /// 5. seen id otherwise — append into whatever is on top.
    ///
    /// A chunk that yields no envelope, id, or step kind is dropped whole;
    /// the tree is never partially mutated.
    pub fn ingest(&mut self, chunk: Value) -> IngestOutcome {
        let meta = match ChunkMeta::extract(&chunk) {
            Ok(meta) => meta,
            Err(reason) => {
                tracing::trace!(?reason, "dropping unrecognized chunk");
                return IngestOutcome::Skipped(reason);
            }
        };

        if !self.seen.contains(&meta.node_id) {
            let node = self.create(&meta, chunk);
            return IngestOutcome::Created { node };
        }

        let top = self.current();
        let matches_top = {
            let top_node = self.tree.node(top);
            meta.node_id == top_node.id()
                || meta.node_id.strip_suffix(COLLABORATOR_SUFFIX) == Some(top_node.id())
        };
        if matches_top {
            if meta.has_collaborator_input {
                // The active unit hands work to a sub-agent: spawn the
                // nested collaborator under the current top.
                let node = self.create(&meta, chunk);
                return IngestOutcome::Created { node };
            }
            self.append_or_new_span(top, &meta, chunk);
            tracing::trace!(node = %meta.node_id, "appended chunk to active node");
            return IngestOutcome::Appended { node: top };
        }

        let closes_parent = {
            let top_node = self.tree.node(top);
            top_node
                .parent()
                .is_some_and(|parent| self.tree.node(parent).id() == meta.node_id)
        };
        if closes_parent {
            self.stack.pop();
            let node = self.current();
            self.append_or_new_span(node, &meta, chunk);
            tracing::debug!(node = %meta.node_id, "closed active node, appended into parent");
            return IngestOutcome::Closed { node };
        }

        if meta.has_collaborator_output {
            if let Some(target) = meta.collaborator_id() {
                return self.rejoin(&target, chunk);
            }
        }

        let node = self.current();
        self.append_or_new_span(node, &meta, chunk);
        tracing::trace!(node = %meta.node_id, "seen unit resumed at current top");
        IngestOutcome::Resumed { node }
    }

    /// The reconstructed tree, readable at any point of the stream.
    pub fn tree(&self) -> &TraceTree {
        &self.tree
    }

    /// Consume the aggregator and take the tree.
    pub fn into_tree(self) -> TraceTree {
        self.tree
    }

    /// Handle of the synthetic root node.
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Handle of the node currently receiving chunks.
    pub fn active_node(&self) -> NodeId {
        self.current()
    }

    /// Depth of the root-to-current path, root included. Never zero.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Look up a node by its registered id.
    ///
    /// Collaborator nodes register under their synthetic `…-agent` id.
    /// Convenience for [`TraceTree::lookup`] on the held tree.
    pub fn lookup(&self, id: &str) -> Option<NodeId> {
        self.tree.lookup(id)
    }

    fn current(&self) -> NodeId {
        self.stack.top().unwrap_or(self.tree.root())
    }

    /// Create a node for an unseen unit (or spawn a collaborator) under
    /// the current top, after sibling promotion.
    fn create(&mut self, meta: &ChunkMeta, chunk: Value) -> NodeId {
        if self.stack.len() > 1 {
            // A chunk of a different phase while a non-pass-through node is
            // active starts a sibling, not a child: close the active node.
            let promote = {
                let top = self.tree.node(self.current());
                !top.is_pass_through() && top.kind() != meta.event_type
            };
            if promote {
                if let Some(closed) = self.stack.pop() {
                    tracing::trace!(
                        closed = %self.tree.node(closed).id(),
                        event_type = %meta.event_type,
                        "sibling promotion, closed active node"
                    );
                }
            }
        }

        let parent = self.current();
        let (node_id, kind) = match meta.collaborator_id() {
            Some(collaborator_id) if meta.has_collaborator_input => {
                (collaborator_id, COLLABORATOR_KIND.to_string())
            }
            _ => (meta.node_id.clone(), meta.event_type.clone()),
        };

        let node = self.tree.alloc_node(node_id.clone(), kind, parent);
        if meta.has_collaborator_input || meta.is_failure() {
            // Collaborator markers and failure records live on the node
            // itself, never inside a span.
            self.tree.node_mut(node).add_loose_chunk(chunk);
        } else {
            let span = self.tree.alloc_span(&meta.chunk_type, node);
            self.tree.node_mut(node).add_child(Child::Span(span));
            self.tree.span_mut(span).append(chunk);
        }

        self.attach(parent, node);
        self.stack.push(node);
        tracing::debug!(
            id = %node_id,
            kind = %self.tree.node(node).kind(),
            "created trace node"
        );
        self.seen.insert(meta.node_id.clone());
        self.seen.insert(node_id);
        node
    }

    /// Attach a freshly created node to its parent: into the parent's open
    /// span when one is active (a unit spawned mid-span), otherwise as a
    /// direct child.
    fn attach(&mut self, parent: NodeId, node: NodeId) {
        match self.tree.node(parent).current_span() {
            Some(span) => self.tree.span_mut(span).push_child_node(node),
            None => self.tree.node_mut(parent).add_child(Child::Node(node)),
        }
    }

    /// Append the chunk to the node's open span, or open a fresh span when
    /// the step kind starts a new unit of work (or no span is open).
    fn append_or_new_span(&mut self, node: NodeId, meta: &ChunkMeta, chunk: Value) {
        match self.tree.node(node).current_span() {
            Some(span) if !starts_new_span(&meta.chunk_type) => {
                self.tree.span_mut(span).append(chunk);
            }
            _ => {
                let span = self.tree.alloc_span(&meta.chunk_type, node);
                self.tree.node_mut(node).add_child(Child::Span(span));
                self.tree.span_mut(span).append(chunk);
            }
        }
    }

    /// Unwind the stack to the collaborator node and record the output
    /// chunk loose there, closing the round-trip.
    fn rejoin(&mut self, target: &str, chunk: Value) -> IngestOutcome {
        while self.stack.len() > 1 {
            let top = self.current();
            if self.tree.node(top).id() == target {
                break;
            }
            self.stack.pop();
        }
        let node = self.current();
        if self.tree.node(node).id() == target {
            tracing::debug!(collaborator = %target, "rejoined collaborator round-trip");
        } else {
            // Stack exhausted before the collaborator surfaced; keep the
            // chunk on the root rather than dropping it.
            tracing::warn!(
                collaborator = %target,
                "collaborator not found on stack, attaching output to root"
            );
        }
        self.tree.node_mut(node).add_loose_chunk(chunk);
        IngestOutcome::Rejoined { node }
    }
}

impl Default for TraceAggregator {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
