//! Replay a canned trace stream and print the reconstructed tree.
//!
//! The stream mirrors what an agent-execution service emits during one
//! streamed invocation: a pre-processing step, an orchestration turn that
//! hands work to a sub-agent collaborator, the collaborator's own model
//! call, and the answer coming back.
//!
//! Set `RUST_LOG=debug` to watch the routing decisions as they happen.
//!
//! Run with: `RUST_LOG=debug cargo run --example basic -p traceweave`

use serde_json::json;
use traceweave::TraceAggregator;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize a tracing subscriber so routing events are visible.
    tracing_subscriber::fmt::init();

    let stream = vec![
        json!({"trace": {"preProcessingTrace": {
            "modelInvocationInput": {"traceId": "pre-1", "text": "classify the request"}}}}),
        json!({"trace": {"preProcessingTrace": {
            "modelInvocationOutput": {"traceId": "pre-1", "text": "benign"}}}}),
        json!({"trace": {"orchestrationTrace": {
            "modelInvocationInput": {"traceId": "orch-1", "text": "plan next step"}}}}),
        json!({"trace": {"orchestrationTrace": {
            "rationale": {"traceId": "orch-1", "text": "the researcher should dig in"}}}}),
        json!({"trace": {"orchestrationTrace": {
            "invocationInput": {"traceId": "orch-1",
                "collaboratorInvocationInput": {"agentName": "researcher"}}}}}),
        json!({"trace": {"orchestrationTrace": {
            "modelInvocationInput": {"traceId": "sub-1", "text": "search the archive"}}}}),
        json!({"trace": {"orchestrationTrace": {
            "modelInvocationOutput": {"traceId": "sub-1", "text": "three matches"}}}}),
        json!({"trace": {"orchestrationTrace": {
            "observation": {"traceId": "orch-1",
                "collaboratorInvocationOutput": {"agentName": "researcher"}}}}}),
    ];

    let mut aggregator = TraceAggregator::new();

    // --- Replay the stream in arrival order ---
    for chunk in stream {
        let outcome = aggregator.ingest(chunk);
        println!("ingest -> {outcome:?}");
    }

    // --- Inspect the reconstructed tree ---
    let tree = aggregator.tree();
    println!(
        "\nreconstructed {} nodes, {} spans, {} chunks",
        tree.node_count(),
        tree.span_count(),
        tree.chunk_count()
    );
    println!("{}", serde_json::to_string_pretty(&tree.to_value())?);

    Ok(())
}
