//! Langfuse public API client
//!
//! Write path: `POST /api/public/ingestion` (batched events).
//! Read path: `GET /api/public/traces/{id}`.

use super::{Observation, TraceStore};
use crate::span::{Span, SpanKind, SpanStatus};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use spanscope_core::{Error, Result, SpanScopeConfig};

/// Connection settings for a Langfuse project
#[derive(Debug, Clone)]
pub struct LangfuseConfig {
    pub host: String,
    pub public_key: String,
    pub secret_key: String,
    pub project_id: Option<String>,
}

impl LangfuseConfig {
    pub fn from_config(config: &SpanScopeConfig) -> Result<Self> {
        let (public_key, secret_key) = config
            .langfuse_credentials()
            .map_err(|e| Error::config_error(e.to_string()))?;

        Ok(Self {
            host: config.tracing.host.trim_end_matches('/').to_string(),
            public_key,
            secret_key,
            project_id: config.tracing.project_id.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct IngestionResponse {
    #[serde(default)]
    errors: Vec<IngestionError>,
}

#[derive(Debug, Deserialize)]
struct IngestionError {
    id: String,
    status: u16,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TraceWithObservations {
    #[serde(default)]
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    data: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: String,
}

/// [`TraceStore`] backed by a Langfuse instance
pub struct LangfuseStore {
    client: Client,
    config: LangfuseConfig,
}

impl LangfuseStore {
    pub fn new(config: LangfuseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Verify credentials; returns the id of the project the keys belong to
    pub async fn auth_check(&self) -> Result<String> {
        let url = format!("{}/api/public/projects", self.config.host);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.public_key, Some(&self.config.secret_key))
            .send()
            .await
            .map_err(|e| Error::TraceStore(format!("Auth check request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::TraceStore(format!(
                "Langfuse authentication failed with status {}",
                response.status()
            )));
        }

        let projects: ProjectsResponse = response
            .json()
            .await
            .map_err(|e| Error::TraceStore(format!("Failed to parse projects response: {}", e)))?;

        projects
            .data
            .into_iter()
            .next()
            .map(|p| p.id)
            .ok_or_else(|| Error::TraceStore("No project found for these credentials".into()))
    }

    /// Use a project id for trace URLs
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.config.project_id = Some(project_id.into());
        self
    }

    /// Build the ingestion batch for a set of spans
    fn ingestion_batch(spans: &[Span]) -> Vec<serde_json::Value> {
        let timestamp = Utc::now().to_rfc3339();
        let mut batch = Vec::with_capacity(spans.len() + 1);

        for span in spans.iter().filter(|s| s.is_root()) {
            batch.push(serde_json::json!({
                "id": uuid::Uuid::new_v4().to_string(),
                "timestamp": timestamp,
                "type": "trace-create",
                "body": {
                    "id": span.trace_id,
                    "timestamp": span.start_time.to_rfc3339(),
                    "name": span.name,
                    "userId": span.user_id,
                    "sessionId": span.session_id,
                    "tags": span.tags,
                    "metadata": span.metadata,
                    "input": span.input,
                    "output": span.output,
                }
            }));
        }

        for span in spans {
            let mut body = serde_json::json!({
                "id": span.id,
                "traceId": span.trace_id,
                "type": span.kind.observation_type(),
                "name": span.name,
                "startTime": span.start_time.to_rfc3339(),
                "endTime": span.end_time.to_rfc3339(),
                "input": span.input,
                "output": span.output,
                "metadata": span.metadata,
                "parentObservationId": span.parent_id,
                "level": match span.status {
                    SpanStatus::Ok => "DEFAULT",
                    SpanStatus::Error => "ERROR",
                },
                "statusMessage": span.error,
            });
            if let (SpanKind::LlmCall, Some(model)) = (span.kind, &span.model) {
                body["model"] = serde_json::Value::String(model.clone());
            }

            batch.push(serde_json::json!({
                "id": uuid::Uuid::new_v4().to_string(),
                "timestamp": timestamp,
                "type": "observation-create",
                "body": body,
            }));
        }

        batch
    }
}

#[async_trait]
impl TraceStore for LangfuseStore {
    fn name(&self) -> &str {
        "langfuse"
    }

    async fn export(&self, spans: Vec<Span>) -> Result<()> {
        if spans.is_empty() {
            return Ok(());
        }

        let url = format!("{}/api/public/ingestion", self.config.host);
        let batch = Self::ingestion_batch(&spans);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.public_key, Some(&self.config.secret_key))
            .json(&serde_json::json!({ "batch": batch }))
            .send()
            .await
            .map_err(|e| Error::TraceStore(format!("Ingestion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::TraceStore(format!(
                "Langfuse ingestion error {}: {}",
                status, error_text
            )));
        }

        let body: IngestionResponse = response.json().await.map_err(|e| {
            Error::TraceStore(format!("Failed to parse ingestion response: {}", e))
        })?;

        if !body.errors.is_empty() {
            let details = body
                .errors
                .iter()
                .map(|e| {
                    format!(
                        "{} ({}): {}",
                        e.id,
                        e.status,
                        e.message.as_deref().unwrap_or("no message")
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::TraceStore(format!(
                "Langfuse rejected {} event(s): {}",
                body.errors.len(),
                details
            )));
        }

        Ok(())
    }

    async fn fetch_observations(&self, trace_id: &str) -> Result<Option<Vec<Observation>>> {
        let url = format!("{}/api/public/traces/{}", self.config.host, trace_id);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.public_key, Some(&self.config.secret_key))
            .send()
            .await
            .map_err(|e| Error::TraceStore(format!("Trace fetch failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::TraceStore(format!(
                "Langfuse trace fetch error {}: {}",
                status, error_text
            )));
        }

        let trace: TraceWithObservations = response
            .json()
            .await
            .map_err(|e| Error::TraceStore(format!("Failed to parse trace: {}", e)))?;

        Ok(Some(trace.observations))
    }

    fn trace_url(&self, trace_id: &str) -> String {
        match &self.config.project_id {
            Some(project_id) => format!(
                "{}/project/{}/traces/{}",
                self.config.host, project_id, trace_id
            ),
            None => format!("{}/trace/{}", self.config.host, trace_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SpanStatus;

    fn store_for(server: &mockito::Server) -> LangfuseStore {
        LangfuseStore::new(LangfuseConfig {
            host: server.url(),
            public_key: "pk-lf-test".into(),
            secret_key: "sk-lf-test".into(),
            project_id: None,
        })
    }

    fn span(id: &str, parent: Option<&str>, kind: SpanKind) -> Span {
        let now = Utc::now();
        Span {
            id: id.into(),
            trace_id: "trace-1".into(),
            parent_id: parent.map(Into::into),
            name: id.into(),
            kind,
            input: serde_json::json!({"q": 1}),
            output: Some(serde_json::json!("ok")),
            error: None,
            status: SpanStatus::Ok,
            start_time: now,
            end_time: now,
            session_id: "sess".into(),
            user_id: "user".into(),
            tags: ["poc".to_string()].into_iter().collect(),
            metadata: serde_json::json!({}),
            model: Some("gpt-4o-mini".into()),
        }
    }

    #[test]
    fn test_ingestion_batch_shape() {
        let mut root = span("root", None, SpanKind::Session);
        root.metadata = serde_json::json!({"model": "gpt-4o-mini", "max_iterations": 10});
        let batch = LangfuseStore::ingestion_batch(&[
            root,
            span("llm", Some("root"), SpanKind::LlmCall),
            span("tool", Some("root"), SpanKind::ToolCall),
        ]);

        assert_eq!(batch.len(), 4);
        assert_eq!(batch[0]["type"], "trace-create");
        assert_eq!(batch[0]["body"]["id"], "trace-1");
        assert_eq!(batch[0]["body"]["sessionId"], "sess");
        assert_eq!(batch[0]["body"]["tags"], serde_json::json!(["poc"]));
        assert_eq!(batch[0]["body"]["metadata"]["max_iterations"], 10);

        let types: Vec<_> = batch[1..]
            .iter()
            .map(|e| e["body"]["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(types, vec!["AGENT", "GENERATION", "TOOL"]);
        assert_eq!(batch[2]["body"]["model"], "gpt-4o-mini");
        assert_eq!(batch[3]["body"]["parentObservationId"], "root");
        assert!(batch[3]["body"].get("model").is_none());
    }

    #[tokio::test]
    async fn test_export_posts_batch_with_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/public/ingestion")
            .match_header(
                "authorization",
                mockito::Matcher::Regex("^Basic .+".to_string()),
            )
            .with_status(207)
            .with_body(r#"{"successes":[],"errors":[]}"#)
            .create_async()
            .await;

        store_for(&server)
            .export(vec![span("root", None, SpanKind::Session)])
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_export_reports_rejected_events() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/public/ingestion")
            .with_status(207)
            .with_body(r#"{"successes":[],"errors":[{"id":"e1","status":400,"message":"bad body"}]}"#)
            .create_async()
            .await;

        let err = store_for(&server)
            .export(vec![span("root", None, SpanKind::Session)])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TraceStore(ref msg) if msg.contains("bad body")));
    }

    #[tokio::test]
    async fn test_export_fails_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/public/ingestion")
            .with_status(401)
            .with_body(r#"{"message":"Invalid credentials"}"#)
            .create_async()
            .await;

        let err = store_for(&server)
            .export(vec![span("root", None, SpanKind::Session)])
            .await
            .unwrap_err();

        match err {
            Error::TraceStore(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("Invalid credentials"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_missing_trace_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/public/traces/trace-1")
            .with_status(404)
            .with_body(r#"{"message":"Trace not found"}"#)
            .create_async()
            .await;

        let result = store_for(&server).fetch_observations("trace-1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fetch_returns_observations() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/public/traces/trace-1")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "id": "trace-1",
                    "observations": [
                        {"id": "a", "type": "AGENT", "name": "run_agent", "parentObservationId": null},
                        {"id": "b", "type": "GENERATION", "name": "call_llm", "parentObservationId": "a"},
                        {"id": "c", "type": "TOOL", "name": "calculate", "parentObservationId": "a"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let observations = store_for(&server)
            .fetch_observations("trace-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(observations.len(), 3);
        assert_eq!(observations[2].name.as_deref(), Some("calculate"));
    }

    #[tokio::test]
    async fn test_auth_check_returns_project() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/public/projects")
            .with_status(200)
            .with_body(r#"{"data":[{"id":"proj-42","name":"demo"}]}"#)
            .create_async()
            .await;

        let store = store_for(&server);
        let project = store.auth_check().await.unwrap();
        assert_eq!(project, "proj-42");

        let store = store.with_project_id(project);
        assert_eq!(
            store.trace_url("abc"),
            format!("{}/project/proj-42/traces/abc", server.url())
        );
    }

    #[tokio::test]
    async fn test_auth_check_rejects_bad_keys() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/public/projects")
            .with_status(401)
            .create_async()
            .await;

        assert!(store_for(&server).auth_check().await.is_err());
    }
}
