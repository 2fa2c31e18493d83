//! Property-based tests: aggregation invariants under arbitrary streams.

use proptest::prelude::*;
use serde_json::{Map, Value, json};
use traceweave::{IngestOutcome, TraceAggregator};

fn arb_phase() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("orchestrationTrace"),
        Just("preProcessingTrace"),
        Just("postProcessingTrace"),
        Just("guardrailTrace"),
        Just("failureTrace"),
    ]
}

fn arb_step_kind() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("invocationInput"),
        Just("modelInvocationInput"),
        Just("modelInvocationOutput"),
        Just("invocationOutput"),
        Just("rationale"),
        Just("observation"),
    ]
}

/// Small id pool so generated streams revisit the same logical units.
fn arb_trace_id() -> impl Strategy<Value = String> {
    (0u8..6).prop_map(|n| format!("t-{n}"))
}

fn arb_marker() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![
        3 => Just(None),
        1 => Just(Some("collaboratorInvocationInput")),
        1 => Just(Some("collaboratorInvocationOutput")),
    ]
}

fn arb_well_formed() -> impl Strategy<Value = Value> {
    (arb_phase(), arb_step_kind(), arb_trace_id(), arb_marker()).prop_map(
        |(phase, step, trace_id, marker)| {
            let mut payload = Map::new();
            payload.insert("traceId".to_string(), Value::String(trace_id));
            payload.insert("text".to_string(), Value::String("sample".to_string()));
            if let Some(marker) = marker {
                payload.insert(marker.to_string(), json!({"agentName": "helper"}));
            }
            let mut phase_obj = Map::new();
            phase_obj.insert(step.to_string(), Value::Object(payload));
            let mut envelope = Map::new();
            envelope.insert(phase.to_string(), Value::Object(phase_obj));
            let mut wrapper = Map::new();
            wrapper.insert("trace".to_string(), Value::Object(envelope));
            Value::Object(wrapper)
        },
    )
}

fn arb_junk() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({})),
        Just(json!(null)),
        Just(json!({"chunk": {"bytes": "aGk="}})),
        Just(json!({"trace": {}})),
        Just(json!({"trace": {"agentId": "a", "sessionId": "s"}})),
        Just(json!({"trace": {"orchestrationTrace": {"modelInvocationInput": {"text": "no id"}}}})),
    ]
}

fn arb_chunk() -> impl Strategy<Value = Value> {
    prop_oneof![4 => arb_well_formed(), 1 => arb_junk()]
}

proptest! {
    #[test]
    fn counts_grow_monotonically_and_skips_are_noops(
        chunks in proptest::collection::vec(arb_chunk(), 0..64),
    ) {
        let mut agg = TraceAggregator::new();
        for chunk in chunks {
            let before = (
                agg.tree().node_count(),
                agg.tree().span_count(),
                agg.tree().chunk_count(),
            );
            let outcome = agg.ingest(chunk);
            let after = (
                agg.tree().node_count(),
                agg.tree().span_count(),
                agg.tree().chunk_count(),
            );

            prop_assert!(after.0 >= before.0, "node count shrank: {before:?} -> {after:?}");
            prop_assert!(after.1 >= before.1, "span count shrank: {before:?} -> {after:?}");
            prop_assert!(after.2 >= before.2, "chunk count shrank: {before:?} -> {after:?}");
            if matches!(outcome, IngestOutcome::Skipped(_)) {
                prop_assert_eq!(before, after, "skip must not touch the tree");
            } else {
                prop_assert_eq!(after.2, before.2 + 1, "a routed chunk lands exactly once");
            }
            prop_assert!(agg.depth() >= 1, "root must never leave the stack");
        }
    }

    #[test]
    fn replay_produces_identical_trees(
        chunks in proptest::collection::vec(arb_chunk(), 0..48),
    ) {
        let mut first = TraceAggregator::new();
        let mut second = TraceAggregator::new();
        for chunk in &chunks {
            first.ingest(chunk.clone());
        }
        for chunk in &chunks {
            second.ingest(chunk.clone());
        }
        prop_assert_eq!(first.tree(), second.tree());
    }

    #[test]
    fn junk_only_streams_leave_a_bare_root(
        chunks in proptest::collection::vec(arb_junk(), 0..32),
    ) {
        let mut agg = TraceAggregator::new();
        for chunk in chunks {
            agg.ingest(chunk);
        }
        let fresh = TraceAggregator::new();
        prop_assert_eq!(agg.tree(), fresh.tree());
        prop_assert_eq!(agg.tree().node_count(), 1);
        prop_assert_eq!(agg.tree().chunk_count(), 0);
    }

    #[test]
    fn created_ids_stay_resolvable(
        chunks in proptest::collection::vec(arb_chunk(), 0..48),
    ) {
        let mut agg = TraceAggregator::new();
        let mut created = Vec::new();
        for chunk in chunks {
            if let IngestOutcome::Created { node } = agg.ingest(chunk) {
                created.push(agg.tree().node(node).id().to_string());
            }
        }
        for id in created {
            prop_assert!(agg.lookup(&id).is_some(), "created id {id} lost from the index");
        }
    }
}
