use crate::inspection::{TraceInspection, classify};
use crate::shape::ExpectedShape;
use spanscope_core::{Error, InspectorConfig, Result};
use spanscope_telemetry::{Observation, TraceStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Floor applied to `poll_interval` so a zero setting cannot spin on the store
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polling window used while waiting for a trace to settle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub poll_interval: Duration,
    pub max_wait: Duration,
    /// Consecutive polls that must see the same non-zero observation count
    pub stable_polls: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&InspectorConfig::default())
    }
}

impl From<&InspectorConfig> for PollConfig {
    fn from(config: &InspectorConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_wait: config.max_wait(),
            stable_polls: config.stable_polls,
        }
    }
}

pub struct TraceInspector {
    store: Arc<dyn TraceStore>,
    poll: PollConfig,
}

impl TraceInspector {
    pub fn new(store: Arc<dyn TraceStore>, mut poll: PollConfig) -> Self {
        if poll.poll_interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                poll_interval_ms = poll.poll_interval.as_millis() as u64,
                min_ms = MIN_POLL_INTERVAL.as_millis() as u64,
                "Poll interval too small, clamping"
            );
            poll.poll_interval = MIN_POLL_INTERVAL;
        }
        Self { store, poll }
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Wait for the trace to settle and classify it.
    ///
    /// Returns once the observation count is non-zero and unchanged for
    /// `stable_polls` consecutive polls, or with whatever was seen last when
    /// `max_wait` runs out. Fetch errors are treated as "not yet available".
    pub async fn inspect(
        &self,
        trace_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<TraceInspection> {
        let started = Instant::now();
        let deadline = started + self.poll.max_wait;
        let required = self.poll.stable_polls.max(1);

        let mut latest: Vec<Observation> = Vec::new();
        let mut last_count: Option<usize> = None;
        let mut stable = 0;
        let mut polls = 0;

        loop {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return Err(Error::Cancelled);
            }

            polls += 1;
            match self.store.fetch_observations(trace_id).await {
                Ok(Some(observations)) if !observations.is_empty() => {
                    let count = observations.len();
                    stable = if last_count == Some(count) { stable + 1 } else { 1 };
                    last_count = Some(count);
                    latest = observations;

                    tracing::debug!(
                        trace_id = %trace_id,
                        poll = polls,
                        observations = count,
                        stable = stable,
                        "Polled trace"
                    );
                }
                Ok(_) => {
                    tracing::debug!(trace_id = %trace_id, poll = polls, "Trace not visible yet");
                    stable = 0;
                    last_count = None;
                }
                Err(e) => {
                    tracing::warn!(
                        trace_id = %trace_id,
                        poll = polls,
                        error = %e,
                        "Trace fetch failed, retrying"
                    );
                    stable = 0;
                }
            }

            if stable >= required {
                tracing::info!(
                    trace_id = %trace_id,
                    polls = polls,
                    observations = latest.len(),
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Trace settled"
                );
                return Ok(classify(trace_id, latest));
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let pause = self.poll.poll_interval.min(deadline - now);

            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(pause) => {}
                    }
                }
                None => tokio::time::sleep(pause).await,
            }
        }

        let waited_ms = started.elapsed().as_millis();
        if latest.is_empty() {
            tracing::warn!(trace_id = %trace_id, waited_ms = waited_ms as u64, "Trace not found");
            return Err(Error::TraceNotFound {
                trace_id: trace_id.to_string(),
                waited_ms,
            });
        }

        tracing::warn!(
            trace_id = %trace_id,
            observations = latest.len(),
            waited_ms = waited_ms as u64,
            "Trace did not settle before the deadline, using last observation set"
        );
        Ok(classify(trace_id, latest))
    }

    /// Inspect the trace and check it against `expected`
    pub async fn validate(
        &self,
        trace_id: &str,
        expected: &ExpectedShape,
        cancel: Option<&CancellationToken>,
    ) -> Result<TraceInspection> {
        let inspection = self.inspect(trace_id, cancel).await?;
        let violations = expected.violations(&inspection);

        if violations.is_empty() {
            Ok(inspection)
        } else {
            Err(Error::ShapeMismatch {
                trace_id: trace_id.to_string(),
                violations,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use spanscope_telemetry::Span;

    mockall::mock! {
        pub Store {}

        #[async_trait]
        impl TraceStore for Store {
            fn name(&self) -> &str;
            async fn export(&self, spans: Vec<Span>) -> Result<()>;
            async fn fetch_observations(&self, trace_id: &str) -> Result<Option<Vec<Observation>>>;
            fn trace_url(&self, trace_id: &str) -> String;
        }
    }

    fn poll() -> PollConfig {
        PollConfig {
            poll_interval: Duration::from_millis(100),
            max_wait: Duration::from_secs(2),
            stable_polls: 2,
        }
    }

    fn obs(id: &str, kind: &str, parent: Option<&str>) -> Observation {
        Observation {
            id: id.into(),
            observation_type: kind.into(),
            name: Some(if kind == "TOOL" { "calculate" } else { "call_llm" }.into()),
            input: None,
            output: None,
            parent_id: parent.map(Into::into),
            start_time: None,
        }
    }

    fn full_trace() -> Vec<Observation> {
        vec![
            obs("root", "AGENT", None),
            obs("g1", "GENERATION", Some("root")),
            obs("t1", "TOOL", Some("root")),
            obs("g2", "GENERATION", Some("root")),
        ]
    }

    /// Store answering successive fetches from a script; the last entry repeats
    fn scripted_store(script: Vec<Result<Option<Vec<Observation>>>>) -> MockStore {
        let mut script = std::collections::VecDeque::from(script);
        let mut last: Option<Vec<Observation>> = None;
        let mut store = MockStore::new();
        store.expect_fetch_observations().returning(move |_| {
            match script.pop_front() {
                Some(Ok(value)) => {
                    last = value.clone();
                    Ok(value)
                }
                Some(Err(e)) => Err(e),
                None => Ok(last.clone()),
            }
        });
        store
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_stable_count() {
        let partial = full_trace()[..2].to_vec();
        let store = scripted_store(vec![
            Ok(None),
            Ok(Some(partial.clone())),
            Ok(Some(full_trace()[..3].to_vec())),
            Ok(Some(full_trace())),
        ]);

        let inspector = TraceInspector::new(Arc::new(store), poll());
        let inspection = inspector.inspect("trace-1", None).await.unwrap();

        assert_eq!(inspection.total_observations, 4);
        assert_eq!(inspection.llm_call_count(), 2);
        assert_eq!(inspection.tool_names(), vec!["calculate"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trace_not_found_after_window() {
        let store = scripted_store(vec![Ok(None)]);
        let inspector = TraceInspector::new(Arc::new(store), poll());

        let err = inspector.inspect("missing", None).await.unwrap_err();
        match err {
            Error::TraceNotFound { trace_id, waited_ms } => {
                assert_eq!(trace_id, "missing");
                assert!(waited_ms >= 2000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_are_retried() {
        let store = scripted_store(vec![
            Err(Error::TraceStore("503 Service Unavailable".into())),
            Ok(Some(full_trace())),
        ]);
        let inspector = TraceInspector::new(Arc::new(store), poll());

        let inspection = inspector.inspect("trace-1", None).await.unwrap();
        assert_eq!(inspection.total_observations, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stabilizing_below_expectation_is_a_mismatch() {
        let store = scripted_store(vec![Ok(Some(full_trace()[..2].to_vec()))]);
        let inspector = TraceInspector::new(Arc::new(store), poll());
        let expected = ExpectedShape::new().exact_tool_calls(1);

        let err = inspector
            .validate("trace-1", &expected, None)
            .await
            .unwrap_err();
        match err {
            Error::ShapeMismatch { violations, .. } => {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].contains("exactly 1 tool call"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinspection_is_idempotent() {
        let store = scripted_store(vec![Ok(Some(full_trace()))]);
        let inspector = TraceInspector::new(Arc::new(store), poll());

        let first = inspector.inspect("trace-1", None).await.unwrap();
        let second = inspector.inspect("trace-1", None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_poll_interval_is_clamped() {
        let fetches = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = fetches.clone();
        let mut store = MockStore::new();
        store.expect_fetch_observations().returning(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(None)
        });

        let inspector = TraceInspector::new(
            Arc::new(store),
            PollConfig {
                poll_interval: Duration::ZERO,
                max_wait: Duration::from_millis(100),
                stable_polls: 2,
            },
        );
        assert_eq!(inspector.poll_config().poll_interval, MIN_POLL_INTERVAL);

        let err = inspector.inspect("missing", None).await.unwrap_err();
        assert!(matches!(err, Error::TraceNotFound { .. }));
        // One fetch per 10ms step over a 100ms window, plus the first
        assert!(fetches.load(std::sync::atomic::Ordering::SeqCst) <= 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation() {
        let store = scripted_store(vec![Ok(None)]);
        let inspector = TraceInspector::new(Arc::new(store), poll());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            canceller.cancel();
        });

        let err = inspector.inspect("trace-1", Some(&token)).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsettled_trace_uses_last_observations() {
        let mut growing: Vec<Result<Option<Vec<Observation>>>> = Vec::new();
        for n in 1..=40 {
            let mut observations = vec![obs("root", "AGENT", None)];
            observations.extend((0..n).map(|i| obs(&format!("g{i}"), "GENERATION", Some("root"))));
            growing.push(Ok(Some(observations)));
        }
        // Keep growing past the window so the count never repeats
        let store = {
            let mut script = std::collections::VecDeque::from(growing);
            let mut n = 100;
            let mut store = MockStore::new();
            store.expect_fetch_observations().returning(move |_| {
                script.pop_front().unwrap_or_else(|| {
                    n += 1;
                    Ok(Some(
                        (0..n).map(|i| obs(&format!("x{i}"), "GENERATION", Some("root"))).collect(),
                    ))
                })
            });
            store
        };

        let inspector = TraceInspector::new(Arc::new(store), poll());
        let inspection = inspector.inspect("trace-1", None).await.unwrap();
        assert!(inspection.total_observations > 1);
    }
}
