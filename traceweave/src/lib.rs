//! # traceweave — streaming trace aggregation for AI agents
//!
//! Reconstructs a hierarchical execution tree from the flat stream of
//! trace chunks a remote agent-execution service emits during one
//! streamed invocation. Each chunk partially describes one step — an
//! orchestration decision, a model call, a tool invocation, a sub-agent
//! collaboration — and chunks for the same logical unit arrive split
//! across multiple stream events. The aggregator rebuilds the tree
//! incrementally, handling interleaving, early closure, and asynchronous
//! callbacks between cooperating agents, without ever seeing the full
//! stream in advance.
//!
//! ## Components
//!
//! | Component | Type | What it does |
//! |-----------|------|--------------|
//! | Aggregator | [`TraceAggregator`] | Routes each chunk into the tree |
//! | Tree | [`TraceTree`] | Arena owning every node and span |
//! | Node | [`TraceNode`] | One logical unit of execution |
//! | Span | [`ChunkSpan`] | Ordered chunks of one step kind |
//! | Outcome | [`IngestOutcome`] | Which routing branch a chunk took |
//!
//! ## Quick start
//!
//! ```
//! use serde_json::json;
//! use traceweave::TraceAggregator;
//!
//! let mut aggregator = TraceAggregator::new();
//! aggregator.ingest(json!({
//!     "trace": {
//!         "orchestrationTrace": {
//!             "modelInvocationInput": { "traceId": "turn-1", "text": "prompt" }
//!         }
//!     }
//! }));
//! aggregator.ingest(json!({
//!     "trace": {
//!         "orchestrationTrace": {
//!             "modelInvocationOutput": { "traceId": "turn-1", "text": "reply" }
//!         }
//!     }
//! }));
//!
//! let tree = aggregator.tree();
//! assert_eq!(tree.node_count(), 2); // synthetic root + one unit
//! assert_eq!(tree.span_count(), 1); // input and output share one span
//! assert_eq!(tree.chunk_count(), 2);
//! ```
//!
//! ## Routing in one paragraph
//!
//! Each chunk resolves to a stable node id derived from its phase and
//! trace id. An unseen id creates a node under the current position
//! (closing the active node first when the chunk starts a sibling phase);
//! a seen id continues, closes, or resumes its unit depending on where it
//! sits relative to the stack top. Collaborator markers spawn a synthetic
//! `…-agent` child node and later unwind the stack back to it when the
//! sub-agent's output returns. Malformed chunks are dropped whole — trace
//! streams are advisory, so a bad fragment never aborts aggregation.
//!
//! ## Scope
//!
//! Transport, retries, and the mapping from tree nodes to wire-format
//! telemetry spans are external collaborators. This crate consumes an
//! ordered sequence of [`serde_json::Value`] records and produces a tree.

#![deny(missing_docs)]

pub mod aggregator;
pub mod chunk;
pub mod node;
pub mod span;
mod stack;
pub mod tree;

pub use aggregator::{IngestOutcome, TraceAggregator};
pub use chunk::SkipReason;
pub use node::{COLLABORATOR_KIND, Child, ROOT_ID, ROOT_KIND, TraceNode};
pub use span::ChunkSpan;
pub use tree::{NodeId, SpanId, TraceTree};
