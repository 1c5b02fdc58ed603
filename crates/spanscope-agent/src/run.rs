use serde::Serialize;
use spanscope_core::{ConversationMessage, Error, ToolCallRequest, ToolCallResult};

/// Default user id when a run does not name one
pub const DEFAULT_USER_ID: &str = "test_user";

/// One user query plus its correlation identifiers
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub query: String,
    pub user_id: String,
    /// Generated when absent
    pub session_id: Option<String>,
    /// Appended to the agent's default tags
    pub tags: Vec<String>,
}

impl RunRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: DEFAULT_USER_ID.to_string(),
            session_id: None,
            tags: Vec::new(),
        }
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Where the loop is between LLM turns
#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    AwaitingLlm,
    ExecutingTools(Vec<ToolCallRequest>),
    Done(String),
}

/// Result of a run that reached a final answer
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub answer: String,
    /// Number of LLM calls made
    pub iterations: usize,
    pub trace_id: String,
    pub trace_url: String,
    pub session_id: String,
    pub user_id: String,
    pub conversation: Vec<ConversationMessage>,
    pub tool_calls: Vec<ToolCallResult>,
}

impl AgentRun {
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A failed run. The trace still exists and can be inspected.
#[derive(Debug, thiserror::Error)]
#[error("{error} (trace {trace_id}: {trace_url})")]
pub struct RunError {
    #[source]
    pub error: Error,
    pub trace_id: String,
    pub trace_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_defaults() {
        let request = RunRequest::new("What is 25 multiplied by 4?");
        assert_eq!(request.user_id, "test_user");
        assert!(request.session_id.is_none());
        assert!(request.tags.is_empty());

        let request = request
            .user_id("test_user_1")
            .session_id("test_single_tool")
            .tag("scenario");
        assert_eq!(request.session_id.as_deref(), Some("test_single_tool"));
        assert_eq!(request.tags, vec!["scenario"]);
    }

    #[test]
    fn test_run_error_keeps_trace_reference() {
        let err = RunError {
            error: Error::MaxIterationsExceeded(10),
            trace_id: "abc".into(),
            trace_url: "memory://traces/abc".into(),
        };
        let text = err.to_string();
        assert!(text.contains("Maximum iterations (10)"));
        assert!(text.contains("memory://traces/abc"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
