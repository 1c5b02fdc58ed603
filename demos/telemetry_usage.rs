//! Tracing an operation by hand and reading the trace back
//!
//! This demo shows how to:
//! - Open a root session span and nest LLM and tool spans under it
//! - Flush finished spans to a trace store
//! - Wait for the trace to settle and check its shape
//!
//! It runs entirely in-process against a store that hides new traces for a
//! few reads, so no credentials are needed.
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run --example telemetry_usage
//! ```

use serde_json::json;
use spanscope_core::SpanScopeConfig;
use spanscope_inspect::{ExpectedShape, PollConfig, TraceInspector};
use spanscope_telemetry::{
    IngestionDelay, InMemoryStore, SpanKind, TraceAttributes, TraceStore, Tracer, init_logging,
};
use spanscope_tool::{DefaultToolContext, default_registry};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    println!("SpanScope Telemetry Example");
    println!("===========================\n");

    let config = SpanScopeConfig::test_defaults();
    let store = Arc::new(InMemoryStore::with_delay(IngestionDelay {
        hidden_reads: 3,
        reveal_per_read: Some(1),
    }));
    let tracer = Tracer::new(store.clone());
    let registry = Arc::new(default_registry()?);

    let attrs = TraceAttributes::new("telemetry_demo")
        .user_id("demo-user")
        .session_id("demo-session")
        .tags(["demo"])
        .metadata("model", json!(config.model.model_name));
    let query = "Calculate 15 * 7";
    let root = tracer.start_trace(attrs, json!({ "query": query }));
    let trace_id = root.trace_id().to_string();
    println!("User: {}", query);

    // Pretend the model asked for the calculator
    let mut generation = root.child(SpanKind::LlmCall, "call_llm", json!({ "iteration": 1 }));
    generation.set_model(config.model.model_name.clone());
    generation.end_ok(json!({ "tool_calls": ["calculate"] }));

    let ctx = Arc::new(DefaultToolContext::new("call_1", trace_id.clone()));
    let arguments = json!({ "expression": "15 * 7" });
    let output = root
        .handle()
        .in_span(SpanKind::ToolCall, "calculate", arguments.clone(), |_span| {
            let registry = registry.clone();
            async move { registry.dispatch("calculate", arguments, ctx).await }
        })
        .await?;
    println!("Tool output: {}", output);

    let mut generation = root.child(SpanKind::LlmCall, "call_llm", json!({ "iteration": 2 }));
    generation.set_model(config.model.model_name.clone());
    let answer = "15 * 7 is 105.";
    generation.end_ok(json!({ "content": answer }));
    root.end_ok(json!({ "answer": answer }));
    println!("Assistant: {}", answer);

    let flushed = tracer.flush().await?;
    println!("\n✓ Flushed {} spans to the '{}' store", flushed, store.name());
    println!("  Trace URL: {}\n", tracer.trace_url(&trace_id));

    println!("Waiting for the trace to settle...");
    let inspector = TraceInspector::new(store, PollConfig::from(&config.inspector));
    let expected = ExpectedShape::new()
        .min_llm_calls(2)
        .exact_tool_calls(1)
        .tool_names(["calculate"]);

    match inspector.validate(&trace_id, &expected, None).await {
        Ok(inspection) => {
            println!(
                "✅ VALIDATION PASSED: {} observations, {} llm calls, {} tool calls",
                inspection.total_observations,
                inspection.llm_call_count(),
                inspection.tool_call_count()
            );
        }
        Err(e) => {
            eprintln!("❌ VALIDATION FAILED: {}", e);
            std::process::exit(1);
        }
    }

    if !output.contains("105") {
        eprintln!("❌ VALIDATION FAILED: calculator output doesn't contain 105");
        eprintln!("   Got: '{}'", output);
        std::process::exit(1);
    }

    tracer.shutdown().await?;
    println!("\n✅ Example complete!");
    Ok(())
}
