//! Trace store boundary: spans go out, observations come back

pub mod langfuse;
pub mod memory;

pub use langfuse::{LangfuseConfig, LangfuseStore};
pub use memory::{IngestionDelay, InMemoryStore};

use crate::span::Span;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spanscope_core::{Error, Result, SpanScopeConfig};
use std::sync::Arc;

/// A stored span as returned by the trace store's read path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: String,
    #[serde(rename = "type")]
    pub observation_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub input: Option<serde_json::Value>,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default, rename = "parentObservationId")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

impl From<&Span> for Observation {
    fn from(span: &Span) -> Self {
        Self {
            id: span.id.clone(),
            observation_type: span.kind.observation_type().to_string(),
            name: Some(span.name.clone()),
            input: Some(span.input.clone()),
            output: span.output.clone(),
            parent_id: span.parent_id.clone(),
            start_time: Some(span.start_time),
        }
    }
}

/// Remote (or emulated) observability store.
///
/// The write path is append-only; the read path is eventually consistent, so
/// a trace may be missing or partial right after export.
#[async_trait]
pub trait TraceStore: Send + Sync {
    fn name(&self) -> &str;

    /// Append finished spans
    async fn export(&self, spans: Vec<Span>) -> Result<()>;

    /// Fetch a trace's observations; `None` while the trace is unknown to the store
    async fn fetch_observations(&self, trace_id: &str) -> Result<Option<Vec<Observation>>>;

    /// Human-facing URL of a trace
    fn trace_url(&self, trace_id: &str) -> String;
}

/// Create the trace store selected by configuration.
///
/// Mocked runs always use the in-memory store; otherwise `tracing.store`
/// picks between `"langfuse"` and `"memory"`.
pub fn create_store(config: &SpanScopeConfig) -> Result<Arc<dyn TraceStore>> {
    if config.is_mocked() {
        return Ok(Arc::new(InMemoryStore::new()));
    }

    match config.tracing.store.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        "langfuse" => Ok(Arc::new(LangfuseStore::new(LangfuseConfig::from_config(
            config,
        )?))),
        other => Err(Error::config_error(format!(
            "Unsupported trace store: {}",
            other
        ))),
    }
}
