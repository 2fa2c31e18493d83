//! Well-known chunk keys and routing-header extraction.
//!
//! Chunks are opaque [`serde_json::Value`]s; only the nested fields named
//! here are ever inspected. Everything else rides along untouched into the
//! tree.

use serde_json::{Map, Value};

// ─── Well-known keys ─────────────────────────────────────────────────────────

/// Wrapper key around all trace content. Envelopes without it carry no
/// trace payload and are dropped.
pub const TRACE: &str = "trace";
/// Step-level id field from which node ids are derived.
pub const TRACE_ID: &str = "traceId";

/// Orchestration phase.
pub const ORCHESTRATION_TRACE: &str = "orchestrationTrace";
/// Pre-processing phase.
pub const PRE_PROCESSING_TRACE: &str = "preProcessingTrace";
/// Post-processing phase.
pub const POST_PROCESSING_TRACE: &str = "postProcessingTrace";
/// Guardrail-evaluation phase.
pub const GUARDRAIL_TRACE: &str = "guardrailTrace";
/// Failure-notification phase. Its chunks are stored loose, never spanned.
pub const FAILURE_TRACE: &str = "failureTrace";

/// Step kind: tool/sub-step input assembly. Starts a new span.
pub const INVOCATION_INPUT: &str = "invocationInput";
/// Step kind: model request assembly. Starts a new span.
pub const MODEL_INVOCATION_INPUT: &str = "modelInvocationInput";
/// Step kind: model response. Continues the open span.
pub const MODEL_INVOCATION_OUTPUT: &str = "modelInvocationOutput";
/// Step kind: tool/sub-step result. Continues the open span.
pub const INVOCATION_OUTPUT: &str = "invocationOutput";
/// Step kind: model reasoning text. Continues the open span.
pub const RATIONALE: &str = "rationale";
/// Step kind: post-step observation. Continues the open span.
pub const OBSERVATION: &str = "observation";

/// Marker key: the current step hands work to a sub-agent collaborator.
pub const COLLABORATOR_INPUT: &str = "collaboratorInvocationInput";
/// Marker key: a sub-agent collaborator handed its result back.
pub const COLLABORATOR_OUTPUT: &str = "collaboratorInvocationOutput";
/// Suffix appended to a unit's id to name its synthetic collaborator node.
pub const COLLABORATOR_SUFFIX: &str = "-agent";

/// Why a chunk was dropped instead of routed.
///
/// Dropping is the only degenerate outcome: trace streams are advisory
/// telemetry, so an unrecognized fragment is skipped whole, never erred,
/// and never leaves a partial mutation behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No `"trace"` object wraps the payload (transport envelope only).
    MissingEnvelope,
    /// No phase object or no `traceId` to derive a node id from.
    MissingTraceId,
    /// The phase object carries no step-kind entry besides the id.
    MissingStepKind,
}

/// The routing header pulled out of one raw chunk.
///
/// Extraction is deterministic: `serde_json` maps iterate in sorted key
/// order, and each rule below picks the first matching entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkMeta {
    /// Phase name: the first object-valued key of the envelope.
    pub(crate) event_type: String,
    /// Stable node id, synthesized as `{event_type}-{raw trace id}` so
    /// repeated fragments of one logical unit resolve to the same id.
    pub(crate) node_id: String,
    /// Step kind: the first key of the phase object other than the id.
    pub(crate) chunk_type: String,
    /// The step carries the collaborator-input marker.
    pub(crate) has_collaborator_input: bool,
    /// The step carries the collaborator-output marker.
    pub(crate) has_collaborator_output: bool,
}

impl ChunkMeta {
    /// Pull the routing header out of a raw chunk.
    ///
    /// The envelope is the object under [`TRACE`]; if that object itself
    /// holds a `"trace"` object (the transport's outer metadata envelope),
    /// extraction descends one more level. The raw id is read from
    /// `traceId` directly on the phase object, or failing that from the
    /// first object-valued member that carries one.
    pub(crate) fn extract(chunk: &Value) -> Result<Self, SkipReason> {
        let mut envelope = chunk
            .get(TRACE)
            .and_then(Value::as_object)
            .ok_or(SkipReason::MissingEnvelope)?;
        if let Some(inner) = envelope.get(TRACE).and_then(Value::as_object) {
            envelope = inner;
        }

        let (event_type, step) = envelope
            .iter()
            .find_map(|(key, value)| value.as_object().map(|obj| (key.as_str(), obj)))
            .ok_or(SkipReason::MissingTraceId)?;

        let raw_id = step
            .get(TRACE_ID)
            .and_then(Value::as_str)
            .or_else(|| {
                step.values()
                    .filter_map(Value::as_object)
                    .find_map(|member| member.get(TRACE_ID).and_then(Value::as_str))
            })
            .ok_or(SkipReason::MissingTraceId)?;

        let chunk_type = step
            .keys()
            .map(String::as_str)
            .find(|key| *key != TRACE_ID)
            .ok_or(SkipReason::MissingStepKind)?;

        let payload = step.get(chunk_type).and_then(Value::as_object);
        let has_marker =
            |marker: &str| step.contains_key(marker) || contains_key(payload, marker);

        Ok(Self {
            node_id: format!("{event_type}-{raw_id}"),
            event_type: event_type.to_string(),
            chunk_type: chunk_type.to_string(),
            has_collaborator_input: has_marker(COLLABORATOR_INPUT),
            has_collaborator_output: has_marker(COLLABORATOR_OUTPUT),
        })
    }

    /// Id of the synthetic collaborator node for this unit. Present only
    /// when the step carries a collaboration marker.
    pub(crate) fn collaborator_id(&self) -> Option<String> {
        (self.has_collaborator_input || self.has_collaborator_output)
            .then(|| format!("{}{COLLABORATOR_SUFFIX}", self.node_id))
    }

    /// Whether this chunk belongs to the failure phase.
    pub(crate) fn is_failure(&self) -> bool {
        self.event_type == FAILURE_TRACE
    }
}

fn contains_key(obj: Option<&Map<String, Value>>, key: &str) -> bool {
    obj.is_some_and(|map| map.contains_key(key))
}

/// Whether a step kind always begins a fresh unit of work.
///
/// Input sub-steps open a new span; outputs, metadata, and intermediate
/// deltas keep accumulating into whatever span is currently open. This
/// mirrors the request/response pairing of the underlying protocol
/// without an explicit close signal.
pub(crate) fn starts_new_span(chunk_type: &str) -> bool {
    chunk_type == INVOCATION_INPUT || chunk_type == MODEL_INVOCATION_INPUT
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Build a chunk with the id nested inside the step payload, the shape
    /// the service emits for ordinary steps.
    fn chunk(event_type: &str, chunk_type: &str, trace_id: &str) -> Value {
        let mut payload = Map::new();
        payload.insert(TRACE_ID.to_string(), Value::String(trace_id.to_string()));
        payload.insert("text".to_string(), Value::String("sample".to_string()));
        let mut phase = Map::new();
        phase.insert(chunk_type.to_string(), Value::Object(payload));
        let mut envelope = Map::new();
        envelope.insert(event_type.to_string(), Value::Object(phase));
        let mut wrapper = Map::new();
        wrapper.insert(TRACE.to_string(), Value::Object(envelope));
        Value::Object(wrapper)
    }

    #[test]
    fn extracts_nested_trace_id() {
        let meta = ChunkMeta::extract(&chunk(
            ORCHESTRATION_TRACE,
            MODEL_INVOCATION_INPUT,
            "t-1",
        ))
        .unwrap();
        assert_eq!(meta.event_type, ORCHESTRATION_TRACE);
        assert_eq!(meta.node_id, "orchestrationTrace-t-1");
        assert_eq!(meta.chunk_type, MODEL_INVOCATION_INPUT);
        assert!(!meta.has_collaborator_input);
        assert!(!meta.has_collaborator_output);
    }

    #[test]
    fn extracts_direct_trace_id() {
        // Failure chunks carry their id directly on the phase object.
        let raw = json!({
            "trace": {
                "failureTrace": {
                    "traceId": "f-1",
                    "failureReason": "access denied",
                    "failureCode": 403
                }
            }
        });
        let meta = ChunkMeta::extract(&raw).unwrap();
        assert_eq!(meta.event_type, FAILURE_TRACE);
        assert_eq!(meta.node_id, "failureTrace-f-1");
        assert!(meta.is_failure());
        // First non-id key in sorted order.
        assert_eq!(meta.chunk_type, "failureCode");
    }

    #[test]
    fn descends_double_wrapped_envelope() {
        let raw = json!({
            "trace": {
                "agentId": "agent-1",
                "sessionId": "sess-9",
                "trace": {
                    "orchestrationTrace": {
                        "rationale": { "traceId": "t-2", "text": "thinking" }
                    }
                }
            }
        });
        let meta = ChunkMeta::extract(&raw).unwrap();
        assert_eq!(meta.node_id, "orchestrationTrace-t-2");
        assert_eq!(meta.chunk_type, RATIONALE);
    }

    #[test]
    fn detects_markers_inside_step_payload() {
        let raw = json!({
            "trace": {
                "orchestrationTrace": {
                    "invocationInput": {
                        "traceId": "t-3",
                        "collaboratorInvocationInput": { "agentName": "researcher" }
                    }
                }
            }
        });
        let meta = ChunkMeta::extract(&raw).unwrap();
        assert!(meta.has_collaborator_input);
        assert!(!meta.has_collaborator_output);
        assert_eq!(
            meta.collaborator_id().as_deref(),
            Some("orchestrationTrace-t-3-agent")
        );
    }

    #[test]
    fn detects_markers_on_the_phase_object() {
        let raw = json!({
            "trace": {
                "orchestrationTrace": {
                    "traceId": "t-4",
                    "collaboratorInvocationOutput": { "text": "done" }
                }
            }
        });
        let meta = ChunkMeta::extract(&raw).unwrap();
        assert!(meta.has_collaborator_output);
        assert_eq!(meta.chunk_type, COLLABORATOR_OUTPUT);
    }

    #[test]
    fn collaborator_id_absent_without_markers() {
        let meta =
            ChunkMeta::extract(&chunk(ORCHESTRATION_TRACE, OBSERVATION, "t-5")).unwrap();
        assert_eq!(meta.collaborator_id(), None);
    }

    #[test]
    fn missing_envelope() {
        assert_eq!(
            ChunkMeta::extract(&json!({"chunk": {"bytes": "aGk="}})),
            Err(SkipReason::MissingEnvelope)
        );
        assert_eq!(
            ChunkMeta::extract(&json!({"trace": "not an object"})),
            Err(SkipReason::MissingEnvelope)
        );
    }

    #[test]
    fn missing_trace_id() {
        // No object-valued phase entry at all.
        assert_eq!(
            ChunkMeta::extract(&json!({"trace": {"agentId": "a", "sessionId": "s"}})),
            Err(SkipReason::MissingTraceId)
        );
        // Phase present but no id anywhere in it.
        assert_eq!(
            ChunkMeta::extract(&json!({
                "trace": {
                    "orchestrationTrace": {
                        "modelInvocationInput": { "text": "no id here" }
                    }
                }
            })),
            Err(SkipReason::MissingTraceId)
        );
    }

    #[test]
    fn missing_step_kind() {
        assert_eq!(
            ChunkMeta::extract(&json!({
                "trace": { "orchestrationTrace": { "traceId": "t-6" } }
            })),
            Err(SkipReason::MissingStepKind)
        );
    }

    #[test]
    fn starts_new_span_only_for_input_kinds() {
        assert!(starts_new_span(INVOCATION_INPUT));
        assert!(starts_new_span(MODEL_INVOCATION_INPUT));
        assert!(!starts_new_span(MODEL_INVOCATION_OUTPUT));
        assert!(!starts_new_span(INVOCATION_OUTPUT));
        assert!(!starts_new_span(RATIONALE));
        assert!(!starts_new_span(OBSERVATION));
    }
}
