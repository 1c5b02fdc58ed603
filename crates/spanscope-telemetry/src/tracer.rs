//! Tracer handle, scoped span guards, and logging setup

use crate::attributes::*;
use crate::span::{Span, SpanContext, SpanKind, SpanStatus, TraceAttributes};
use crate::spans::{log_span, to_json_value};
use crate::store::TraceStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use spanscope_core::Result;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::Instrument;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DROPPED_SPAN_ERROR: &str = "span dropped before completion";

struct TracerInner {
    store: Arc<dyn TraceStore>,
    buffer: Mutex<Vec<Span>>,
    shut_down: AtomicBool,
}

/// Explicitly constructed tracing client.
///
/// Finished spans are buffered in memory and handed to the [`TraceStore`] on
/// [`flush`](Tracer::flush). Cloning is cheap; clones share the buffer.
#[derive(Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

impl Tracer {
    pub fn new(store: Arc<dyn TraceStore>) -> Self {
        Self {
            inner: Arc::new(TracerInner {
                store,
                buffer: Mutex::new(Vec::new()),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn store(&self) -> Arc<dyn TraceStore> {
        self.inner.store.clone()
    }

    /// Open the root session span of a new trace
    pub fn start_trace(&self, attrs: TraceAttributes, input: serde_json::Value) -> SpanGuard {
        let trace_id = uuid::Uuid::new_v4().simple().to_string();
        let name = attrs.name.clone();
        SpanGuard::open(
            self.clone(),
            Arc::new(attrs),
            trace_id,
            None,
            SpanKind::Session,
            name,
            input,
        )
    }

    pub fn trace_url(&self, trace_id: &str) -> String {
        self.inner.store.trace_url(trace_id)
    }

    /// Number of finished spans waiting to be exported
    pub fn pending(&self) -> usize {
        self.lock_buffer().len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Export buffered spans. On failure the spans stay buffered for the next flush.
    pub async fn flush(&self) -> Result<usize> {
        let spans = std::mem::take(&mut *self.lock_buffer());
        if spans.is_empty() {
            return Ok(0);
        }

        let count = spans.len();
        match self.inner.store.export(spans.clone()).await {
            Ok(()) => {
                tracing::debug!(store = %self.inner.store.name(), spans = count, "Flushed spans");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(store = %self.inner.store.name(), error = %e, "Span export failed");
                let mut buffer = self.lock_buffer();
                let newer = std::mem::replace(&mut *buffer, spans);
                buffer.extend(newer);
                Err(e)
            }
        }
    }

    /// Flush remaining spans and stop accepting new ones
    pub async fn shutdown(&self) -> Result<()> {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        self.flush().await.map(|_| ())
    }

    /// Run `op` inside a child span of `parent`.
    ///
    /// The span records the operation's output or error and is closed before
    /// this returns; the operation's result is passed through unchanged. If the
    /// returned future is dropped early the span is closed as an error.
    pub async fn in_span<T, E, F, Fut>(
        &self,
        parent: &SpanHandle,
        kind: SpanKind,
        name: impl Into<String>,
        input: serde_json::Value,
        op: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize,
        E: Display,
        F: FnOnce(SpanHandle) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let guard = SpanGuard::open(
            self.clone(),
            parent.attrs.clone(),
            parent.context.trace_id.clone(),
            Some(parent.context.span_id.clone()),
            kind,
            name.into(),
            input,
        );
        let handle = guard.handle();
        guard.run(op(handle)).await
    }

    fn record(&self, span: Span) {
        if self.is_shut_down() {
            tracing::warn!(span = %span.name, trace_id = %span.trace_id, "Span finished after tracer shutdown, discarding");
            return;
        }
        self.lock_buffer().push(span);
    }

    fn lock_buffer(&self) -> std::sync::MutexGuard<'_, Vec<Span>> {
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct OpenSpan {
    parent_id: Option<String>,
    name: String,
    kind: SpanKind,
    input: serde_json::Value,
    start_time: DateTime<Utc>,
    metadata: serde_json::Map<String, serde_json::Value>,
    model: Option<String>,
}

/// An open span. Closing happens exactly once: through [`end_ok`](SpanGuard::end_ok),
/// [`end_err`](SpanGuard::end_err), or on drop (recorded as an error).
pub struct SpanGuard {
    tracer: Tracer,
    attrs: Arc<TraceAttributes>,
    context: SpanContext,
    log_span: tracing::Span,
    open: Option<OpenSpan>,
}

impl SpanGuard {
    fn open(
        tracer: Tracer,
        attrs: Arc<TraceAttributes>,
        trace_id: String,
        parent_id: Option<String>,
        kind: SpanKind,
        name: String,
        input: serde_json::Value,
    ) -> Self {
        let context = SpanContext {
            trace_id,
            span_id: uuid::Uuid::new_v4().to_string(),
        };
        let log_span = log_span(kind, &name, &context, parent_id.as_deref(), &attrs);

        // Trace-level metadata lives on the root span
        let metadata = match (&parent_id, &attrs.metadata) {
            (None, serde_json::Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };

        Self {
            tracer,
            attrs,
            context,
            log_span,
            open: Some(OpenSpan {
                parent_id,
                name,
                kind,
                input,
                start_time: Utc::now(),
                metadata,
                model: None,
            }),
        }
    }

    pub fn context(&self) -> &SpanContext {
        &self.context
    }

    pub fn trace_id(&self) -> &str {
        &self.context.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.context.span_id
    }

    pub fn attributes(&self) -> &TraceAttributes {
        &self.attrs
    }

    /// The `tracing` span mirroring this span, for instrumenting futures
    pub fn log_span(&self) -> &tracing::Span {
        &self.log_span
    }

    /// Cloneable handle for opening children of this span
    pub fn handle(&self) -> SpanHandle {
        SpanHandle {
            tracer: self.tracer.clone(),
            attrs: self.attrs.clone(),
            context: self.context.clone(),
        }
    }

    pub fn child(
        &self,
        kind: SpanKind,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> SpanGuard {
        self.handle().child(kind, name, input)
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        let model = model.into();
        self.log_span.record(GEN_AI_REQUEST_MODEL, model.as_str());
        if let Some(open) = self.open.as_mut() {
            open.model = Some(model);
        }
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        if key == "tool_call_id" {
            if let Some(id) = value.as_str() {
                self.log_span.record(GEN_AI_TOOL_CALL_ID, id);
            }
        }
        if let Some(open) = self.open.as_mut() {
            open.metadata.insert(key, value);
        }
    }

    /// Close the span successfully with the given output
    pub fn end_ok(mut self, output: serde_json::Value) {
        self.close(Some(output), None);
    }

    /// Close the span as failed with the given error description
    pub fn end_err(mut self, error: impl Display) {
        self.close(None, Some(error.to_string()));
    }

    /// Drive `fut` inside this span and close it with the result.
    ///
    /// Like [`Tracer::in_span`], but for a guard opened (and possibly
    /// annotated) by the caller.
    pub async fn run<T, E, Fut>(self, fut: Fut) -> std::result::Result<T, E>
    where
        T: Serialize,
        E: Display,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let log_span = self.log_span.clone();
        let result = fut.instrument(log_span).await;
        self.end_with(&result);
        result
    }

    /// Close the span from an operation result, recording output or error
    pub fn end_with<T: Serialize, E: Display>(self, result: &std::result::Result<T, E>) {
        match result {
            Ok(value) => self.end_ok(to_json_value(value)),
            Err(e) => self.end_err(e),
        }
    }

    fn close(&mut self, output: Option<serde_json::Value>, error: Option<String>) {
        let Some(open) = self.open.take() else {
            return;
        };

        let status = if error.is_some() {
            SpanStatus::Error
        } else {
            SpanStatus::Ok
        };
        let end_time = Utc::now().max(open.start_time);

        match &error {
            Some(e) => {
                self.log_span.record(SPANSCOPE_STATUS, "error");
                self.log_span.record(SPANSCOPE_ERROR, e.as_str());
            }
            None => {
                self.log_span.record(SPANSCOPE_STATUS, "ok");
            }
        }

        self.tracer.record(Span {
            id: self.context.span_id.clone(),
            trace_id: self.context.trace_id.clone(),
            parent_id: open.parent_id,
            name: open.name,
            kind: open.kind,
            input: open.input,
            output,
            error,
            status,
            start_time: open.start_time,
            end_time,
            session_id: self.attrs.session_id.clone(),
            user_id: self.attrs.user_id.clone(),
            tags: self.attrs.tags.clone(),
            metadata: serde_json::Value::Object(open.metadata),
            model: open.model,
        });
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if self.open.is_some() {
            self.close(None, Some(DROPPED_SPAN_ERROR.to_string()));
        }
    }
}

/// Parent reference used to open child spans without holding the parent guard
#[derive(Clone)]
pub struct SpanHandle {
    tracer: Tracer,
    attrs: Arc<TraceAttributes>,
    context: SpanContext,
}

impl SpanHandle {
    pub fn context(&self) -> &SpanContext {
        &self.context
    }

    pub fn trace_id(&self) -> &str {
        &self.context.trace_id
    }

    pub fn child(
        &self,
        kind: SpanKind,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> SpanGuard {
        SpanGuard::open(
            self.tracer.clone(),
            self.attrs.clone(),
            self.context.trace_id.clone(),
            Some(self.context.span_id.clone()),
            kind,
            name.into(),
            input,
        )
    }

    /// Run `op` inside a child span; see [`Tracer::in_span`]
    pub async fn in_span<T, E, F, Fut>(
        &self,
        kind: SpanKind,
        name: impl Into<String>,
        input: serde_json::Value,
        op: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize,
        E: Display,
        F: FnOnce(SpanHandle) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.tracer.in_span(self, kind, name, input, op).await
    }
}

/// Initialize structured logging.
///
/// Installs a `fmt` layer filtered by `RUST_LOG` (default `info`). Set
/// `SPANSCOPE_LOG_FORMAT=json` for JSON lines. Calling this more than once is
/// harmless; only the first call installs a subscriber.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("SPANSCOPE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let result = if json {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(false)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn tracer_with_store() -> (Tracer, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (Tracer::new(store.clone()), store)
    }

    fn session_attrs() -> TraceAttributes {
        TraceAttributes::new("run_agent")
            .user_id("test_user")
            .session_id("sess-1")
            .tags(["poc", "agent"])
    }

    #[tokio::test]
    async fn test_children_are_parented_to_root() {
        let (tracer, store) = tracer_with_store();

        let root = tracer.start_trace(session_attrs(), serde_json::json!({"query": "hi"}));
        let trace_id = root.trace_id().to_string();
        let root_id = root.span_id().to_string();

        let llm = root.child(SpanKind::LlmCall, "call_llm", serde_json::json!({}));
        llm.end_ok(serde_json::json!({"content": "hello"}));
        root.end_ok(serde_json::json!({"answer": "hello"}));

        assert_eq!(tracer.flush().await.unwrap(), 2);

        let spans = store.spans(&trace_id);
        assert_eq!(spans.len(), 2);
        let roots: Vec<_> = spans.iter().filter(|s| s.is_root()).collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, root_id);

        let child = spans.iter().find(|s| s.kind == SpanKind::LlmCall).unwrap();
        assert_eq!(child.parent_id.as_deref(), Some(root_id.as_str()));
        assert_eq!(child.session_id, "sess-1");
        assert_eq!(child.user_id, "test_user");
        assert!(child.tags.contains("poc"));
        assert!(child.end_time >= child.start_time);
    }

    #[tokio::test]
    async fn test_dropped_guard_closes_as_error() {
        let (tracer, _store) = tracer_with_store();

        {
            let root = tracer.start_trace(session_attrs(), serde_json::Value::Null);
            let _tool = root.child(SpanKind::ToolCall, "calculate", serde_json::Value::Null);
        }

        let spans = tracer.lock_buffer().clone();
        assert_eq!(spans.len(), 2);
        assert!(spans.iter().all(|s| s.status == SpanStatus::Error));
        assert!(
            spans
                .iter()
                .all(|s| s.error.as_deref() == Some(DROPPED_SPAN_ERROR))
        );
    }

    #[tokio::test]
    async fn test_in_span_records_error_and_passes_it_through() {
        let (tracer, _store) = tracer_with_store();
        let root = tracer.start_trace(session_attrs(), serde_json::Value::Null);

        let result: std::result::Result<String, spanscope_core::Error> = root
            .handle()
            .in_span(
                SpanKind::ToolCall,
                "calculate",
                serde_json::json!({"expression": "1/"}),
                |_| async { Err(spanscope_core::Error::tool_execution("calculate", "bad input")) },
            )
            .await;

        assert!(matches!(
            result,
            Err(spanscope_core::Error::ToolExecution { .. })
        ));

        let spans = tracer.lock_buffer().clone();
        let tool = spans.iter().find(|s| s.kind == SpanKind::ToolCall).unwrap();
        assert_eq!(tool.status, SpanStatus::Error);
        assert!(tool.error.as_deref().unwrap().contains("bad input"));
        assert_eq!(tool.input["expression"], "1/");
        drop(root);
    }

    #[tokio::test]
    async fn test_in_span_records_output() {
        let (tracer, _store) = tracer_with_store();
        let root = tracer.start_trace(session_attrs(), serde_json::Value::Null);

        let value: std::result::Result<u32, spanscope_core::Error> = root
            .handle()
            .in_span(SpanKind::ToolCall, "answer", serde_json::Value::Null, |_| async {
                Ok(42)
            })
            .await;
        assert_eq!(value.unwrap(), 42);

        let spans = tracer.lock_buffer().clone();
        assert_eq!(spans[0].output, Some(serde_json::json!(42)));
        assert_eq!(spans[0].status, SpanStatus::Ok);
        root.end_ok(serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_trace_metadata_lands_on_root_only() {
        let (tracer, store) = tracer_with_store();

        let attrs = session_attrs()
            .metadata("model", serde_json::json!("gpt-4o-mini"))
            .metadata("max_iterations", serde_json::json!(10));
        let root = tracer.start_trace(attrs, serde_json::Value::Null);
        let trace_id = root.trace_id().to_string();

        let mut llm = root.child(SpanKind::LlmCall, "call_llm", serde_json::Value::Null);
        llm.set_metadata("iteration", serde_json::json!(1));
        llm.end_ok(serde_json::Value::Null);
        root.end_ok(serde_json::Value::Null);
        tracer.flush().await.unwrap();

        let spans = store.spans(&trace_id);
        let root = spans.iter().find(|s| s.is_root()).unwrap();
        assert_eq!(root.metadata["model"], "gpt-4o-mini");
        assert_eq!(root.metadata["max_iterations"], 10);

        let child = spans.iter().find(|s| !s.is_root()).unwrap();
        assert_eq!(child.metadata, serde_json::json!({"iteration": 1}));
    }

    #[tokio::test]
    async fn test_run_keeps_caller_metadata() {
        let (tracer, _store) = tracer_with_store();
        let root = tracer.start_trace(session_attrs(), serde_json::Value::Null);

        let mut span = root.child(SpanKind::ToolCall, "calculate", serde_json::Value::Null);
        span.set_metadata("tool_call_id", serde_json::json!("call_1"));
        let result: std::result::Result<&str, String> = span.run(async { Ok("4") }).await;
        assert_eq!(result.unwrap(), "4");

        let spans = tracer.lock_buffer().clone();
        assert_eq!(spans[0].metadata["tool_call_id"], "call_1");
        assert_eq!(spans[0].output, Some(serde_json::json!("4")));
        root.end_ok(serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_failed_export_keeps_spans_buffered() {
        let store = Arc::new(FlakyStore::default());
        let tracer = Tracer::new(store.clone());

        let root = tracer.start_trace(session_attrs(), serde_json::Value::Null);
        root.end_ok(serde_json::Value::Null);

        store.fail_next.store(true, Ordering::SeqCst);
        assert!(tracer.flush().await.is_err());
        assert_eq!(tracer.pending(), 1);

        assert_eq!(tracer.flush().await.unwrap(), 1);
        assert_eq!(tracer.pending(), 0);
        assert_eq!(store.exported.lock().unwrap().len(), 1);
    }

    /// Store whose next export fails once when `fail_next` is set
    #[derive(Default)]
    struct FlakyStore {
        fail_next: AtomicBool,
        exported: Mutex<Vec<Span>>,
    }

    #[async_trait::async_trait]
    impl TraceStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn export(&self, spans: Vec<Span>) -> Result<()> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(spanscope_core::Error::TraceStore("503 Service Unavailable".into()));
            }
            self.exported.lock().unwrap().extend(spans);
            Ok(())
        }

        async fn fetch_observations(
            &self,
            _trace_id: &str,
        ) -> Result<Option<Vec<crate::store::Observation>>> {
            Ok(None)
        }

        fn trace_url(&self, trace_id: &str) -> String {
            format!("flaky://{}", trace_id)
        }
    }

    #[tokio::test]
    async fn test_shutdown_flushes_and_discards_late_spans() {
        let (tracer, store) = tracer_with_store();

        let root = tracer.start_trace(session_attrs(), serde_json::Value::Null);
        let trace_id = root.trace_id().to_string();
        let late = root.child(SpanKind::LlmCall, "call_llm", serde_json::Value::Null);
        root.end_ok(serde_json::Value::Null);

        tracer.shutdown().await.unwrap();
        late.end_ok(serde_json::Value::Null);

        assert_eq!(store.spans(&trace_id).len(), 1);
        assert_eq!(tracer.pending(), 0);
    }
}
