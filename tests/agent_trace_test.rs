//! Agent runs checked through the trace store read path

use serde_json::json;
use spanscope_agent::testing::{ScriptedLlm, ScriptedTurn};
use spanscope_agent::{Agent, RunRequest};
use spanscope_core::{Error, SpanScopeConfig};
use spanscope_inspect::{ExpectedShape, PollConfig, TraceInspector};
use spanscope_telemetry::{IngestionDelay, InMemoryStore, SpanKind, SpanStatus, Tracer};
use spanscope_tool::default_registry;
use std::sync::Arc;
use std::time::Duration;

fn agent(turns: Vec<ScriptedTurn>, store: Arc<InMemoryStore>) -> Agent {
    Agent::builder()
        .config(&SpanScopeConfig::test_defaults())
        .model(Arc::new(ScriptedLlm::new(turns)))
        .registry(Arc::new(default_registry().unwrap()))
        .tracer(Tracer::new(store))
        .build()
        .unwrap()
}

fn inspector(store: Arc<InMemoryStore>) -> TraceInspector {
    TraceInspector::new(
        store,
        PollConfig {
            poll_interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(2),
            stable_polls: 2,
        },
    )
}

#[tokio::test]
async fn test_multi_tool_trace_is_visible_after_ingestion_delay() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryStore::with_delay(IngestionDelay {
        hidden_reads: 2,
        reveal_per_read: Some(2),
    }));
    let agent = agent(
        vec![
            ScriptedTurn::call_tools([
                ("get_current_time", json!({"timezone": "UTC"})),
                ("calculate", json!({"expression": "100 / 5"})),
            ]),
            ScriptedTurn::answer("It is noon UTC, and 100 divided by 5 is 20."),
        ],
        store.clone(),
    );

    let run = agent
        .run(
            RunRequest::new("What time is it? Also, what is 100 divided by 5?")
                .user_id("test_user_2")
                .session_id("test_multi_tool"),
        )
        .await?;

    let expected = ExpectedShape::new()
        .min_llm_calls(2)
        .exact_tool_calls(2)
        .tool_names(["calculate", "get_current_time"]);
    let inspection = inspector(store.clone())
        .validate(&run.trace_id, &expected, None)
        .await?;

    assert_eq!(inspection.total_observations, 5);
    assert_eq!(inspection.roots, 1);
    assert_eq!(inspection.orphans, 0);

    let spans = store.spans(&run.trace_id);
    assert!(spans.iter().all(|s| s.session_id == "test_multi_tool"));
    assert!(spans.iter().all(|s| s.user_id == "test_user_2"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_expression_is_reported_back_to_the_model() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryStore::new());
    let agent = agent(
        vec![
            ScriptedTurn::call_tools([("calculate", json!({"expression": "not an expression"}))]),
            ScriptedTurn::answer("That is not a valid expression."),
        ],
        store.clone(),
    );

    let run = agent.run(RunRequest::new("Calculate: not an expression")).await?;
    assert_eq!(run.iterations, 2);
    assert!(run.tool_calls[0].is_error());

    let spans = store.spans(&run.trace_id);
    let tool_span = spans
        .iter()
        .find(|s| s.kind == SpanKind::ToolCall)
        .expect("tool span");
    assert_eq!(tool_span.name, "calculate");
    assert_eq!(tool_span.status, SpanStatus::Error);
    assert!(tool_span.error.is_some());

    // The run itself still succeeded
    let root = spans.iter().find(|s| s.is_root()).expect("root span");
    assert_eq!(root.status, SpanStatus::Ok);
    Ok(())
}

#[tokio::test]
async fn test_failed_run_leaves_an_inspectable_trace() {
    let store = Arc::new(InMemoryStore::new());
    let agent = agent(vec![ScriptedTurn::fail("OpenAI API error 429")], store.clone());

    let err = agent.run(RunRequest::new("Hello")).await.unwrap_err();
    assert!(matches!(err.error, Error::Gateway(_)));

    let inspection = inspector(store).inspect(&err.trace_id, None).await.unwrap();
    assert_eq!(inspection.roots, 1);
    assert_eq!(inspection.llm_call_count(), 1);
    assert_eq!(inspection.tool_call_count(), 0);
}

#[tokio::test]
async fn test_unknown_trace_is_not_found() {
    let store = Arc::new(InMemoryStore::new());
    let inspector = TraceInspector::new(
        store,
        PollConfig {
            poll_interval: Duration::from_millis(5),
            max_wait: Duration::from_millis(50),
            stable_polls: 2,
        },
    );

    let err = inspector.inspect("does-not-exist", None).await.unwrap_err();
    assert!(matches!(err, Error::TraceNotFound { .. }));
}
