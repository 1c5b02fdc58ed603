//! Process-local trace store with emulated ingestion latency

use super::{Observation, TraceStore};
use crate::span::Span;
use async_trait::async_trait;
use dashmap::DashMap;
use spanscope_core::Result;

/// How exported spans become visible to readers.
///
/// `hidden_reads` fetches return nothing at all; after that `reveal_per_read`
/// (when set) limits how many observations each further fetch uncovers, so a
/// trace grows over several polls the way a real ingestion pipeline does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionDelay {
    pub hidden_reads: usize,
    pub reveal_per_read: Option<usize>,
}

impl IngestionDelay {
    pub fn immediate() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct StoredTrace {
    spans: Vec<Span>,
    reads: usize,
}

/// In-memory [`TraceStore`] used by mocked runs and tests
#[derive(Default)]
pub struct InMemoryStore {
    traces: DashMap<String, StoredTrace>,
    delay: IngestionDelay,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: IngestionDelay) -> Self {
        Self {
            traces: DashMap::new(),
            delay,
        }
    }

    /// All spans exported for a trace, regardless of visibility
    pub fn spans(&self, trace_id: &str) -> Vec<Span> {
        self.traces
            .get(trace_id)
            .map(|t| t.spans.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TraceStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn export(&self, spans: Vec<Span>) -> Result<()> {
        for span in spans {
            self.traces
                .entry(span.trace_id.clone())
                .or_default()
                .spans
                .push(span);
        }
        Ok(())
    }

    async fn fetch_observations(&self, trace_id: &str) -> Result<Option<Vec<Observation>>> {
        let Some(mut trace) = self.traces.get_mut(trace_id) else {
            return Ok(None);
        };

        trace.reads += 1;
        if trace.reads <= self.delay.hidden_reads {
            return Ok(None);
        }

        let visible = match self.delay.reveal_per_read {
            Some(step) => (trace.reads - self.delay.hidden_reads).saturating_mul(step),
            None => trace.spans.len(),
        };

        let mut ordered: Vec<&Span> = trace.spans.iter().collect();
        ordered.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));

        Ok(Some(
            ordered
                .into_iter()
                .take(visible)
                .map(Observation::from)
                .collect(),
        ))
    }

    fn trace_url(&self, trace_id: &str) -> String {
        format!("memory://traces/{}", trace_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{SpanKind, SpanStatus};
    use chrono::Utc;

    fn span(trace_id: &str, id: &str, parent: Option<&str>, kind: SpanKind) -> Span {
        let now = Utc::now();
        Span {
            id: id.into(),
            trace_id: trace_id.into(),
            parent_id: parent.map(Into::into),
            name: id.into(),
            kind,
            input: serde_json::Value::Null,
            output: None,
            error: None,
            status: SpanStatus::Ok,
            start_time: now,
            end_time: now,
            session_id: "s".into(),
            user_id: "u".into(),
            tags: Default::default(),
            metadata: serde_json::Value::Null,
            model: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_trace_is_none() {
        let store = InMemoryStore::new();
        assert!(store.fetch_observations("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_immediate_visibility() {
        let store = InMemoryStore::new();
        store
            .export(vec![
                span("t", "root", None, SpanKind::Session),
                span("t", "llm", Some("root"), SpanKind::LlmCall),
            ])
            .await
            .unwrap();

        let observations = store.fetch_observations("t").await.unwrap().unwrap();
        assert_eq!(observations.len(), 2);
        assert!(observations.iter().any(|o| o.observation_type == "GENERATION"));
        assert_eq!(store.trace_url("t"), "memory://traces/t");
    }

    #[tokio::test]
    async fn test_delayed_and_gradual_visibility() {
        let store = InMemoryStore::with_delay(IngestionDelay {
            hidden_reads: 2,
            reveal_per_read: Some(1),
        });
        store
            .export(vec![
                span("t", "a", None, SpanKind::Session),
                span("t", "b", Some("a"), SpanKind::LlmCall),
                span("t", "c", Some("a"), SpanKind::ToolCall),
            ])
            .await
            .unwrap();

        assert!(store.fetch_observations("t").await.unwrap().is_none());
        assert!(store.fetch_observations("t").await.unwrap().is_none());

        let counts: Vec<usize> = poll_counts(&store, 4).await;
        assert_eq!(counts, vec![1, 2, 3, 3]);
    }

    async fn poll_counts(store: &InMemoryStore, polls: usize) -> Vec<usize> {
        let mut counts = Vec::new();
        for _ in 0..polls {
            let observed = store.fetch_observations("t").await.unwrap().unwrap_or_default();
            counts.push(observed.len());
        }
        counts
    }
}
