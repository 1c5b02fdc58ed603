//! Fixed scenarios run end to end through the harness

use spanscope_core::SpanScopeConfig;
use spanscope_harness::{CANNED_PROMPTS, Harness, ScenarioVerdict, find_scenario, fixed_scenarios};
use spanscope_agent::RunRequest;
use spanscope_telemetry::{IngestionDelay, InMemoryStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_mocked_scenarios_all_pass() {
    let harness = Harness::from_config(SpanScopeConfig::test_defaults()).unwrap();
    let summary = harness.run_all(&fixed_scenarios(), None).await;
    harness.shutdown().await.unwrap();

    assert!(summary.all_passed(), "{}", summary);
    assert_eq!(summary.total(), 3);
    assert!(summary.to_string().contains("Test results summary:"));

    let single = &summary.reports[0];
    assert_eq!(single.name, "single_tool");
    assert_eq!(single.iterations, Some(2));
    let inspection = single.inspection.as_ref().unwrap();
    assert_eq!(inspection.tool_names(), vec!["calculate"]);

    let no_tools = &summary.reports[2];
    assert_eq!(no_tools.inspection.as_ref().unwrap().tool_call_count(), 0);
}

#[tokio::test]
async fn test_scenarios_pass_against_a_slow_store() {
    let store = Arc::new(InMemoryStore::with_delay(IngestionDelay {
        hidden_reads: 4,
        reveal_per_read: Some(1),
    }));
    let harness = Harness::with_store(SpanScopeConfig::test_defaults(), store).unwrap();

    let summary = harness.run_all(&fixed_scenarios(), None).await;
    assert!(summary.all_passed(), "{}", summary);
}

#[tokio::test]
async fn test_cancelled_batch_stops_early() {
    let harness = Harness::from_config(SpanScopeConfig::test_defaults()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = harness.run_all(&fixed_scenarios(), Some(&cancel)).await;
    assert_eq!(summary.total(), 0);
    assert!(!summary.all_passed());
}

#[tokio::test]
async fn test_canned_prompt_with_two_tool_turns() {
    let harness = Harness::from_config(SpanScopeConfig::test_defaults()).unwrap();
    let run = harness
        .run_query(RunRequest::new(CANNED_PROMPTS[2]))
        .await
        .unwrap();

    assert_eq!(run.iterations, 3);
    assert_eq!(run.tool_names(), vec!["get_random_fact", "calculate"]);
    assert!(run.answer.contains("168"));
    assert!(run.tool_calls[1].content().contains("168"));
}

#[tokio::test]
async fn test_missing_answer_text_fails_the_scenario() {
    let harness = Harness::from_config(SpanScopeConfig::test_defaults()).unwrap();
    let mut scenario = find_scenario("no_tools").unwrap();
    scenario.expected_answer = vec!["superposition".into()];

    let report = harness.run_scenario(&scenario, None).await;
    assert!(
        matches!(report.verdict, ScenarioVerdict::Failed(ref reasons) if reasons.len() == 1),
        "{}",
        report
    );
}

/// Needs OPENAI_API_KEY, LANGFUSE_PUBLIC_KEY and LANGFUSE_SECRET_KEY
#[tokio::test]
#[ignore]
async fn test_live_scenarios() {
    let config = SpanScopeConfig::load().unwrap();
    if config.is_mocked() {
        return;
    }

    let harness = Harness::from_config(config).unwrap();
    let summary = harness.run_all(&fixed_scenarios(), None).await;
    harness.shutdown().await.unwrap();
    assert!(summary.all_passed(), "{}", summary);
}
