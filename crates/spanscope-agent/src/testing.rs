//! Scripted model for tests and mocked runs
//!
//! [`ScriptedLlm`] replays a fixed sequence of turns, one per request, and
//! records every request it receives.

use async_trait::async_trait;
use spanscope_core::{Error, Llm, LlmRequest, LlmResponse, Result, ToolCallRequest};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted model turn
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    Respond(LlmResponse),
    Fail(String),
}

impl ScriptedTurn {
    pub fn answer(text: impl Into<String>) -> Self {
        ScriptedTurn::Respond(LlmResponse::answer(text))
    }

    /// Request one call per `(name, arguments)` pair, with ids `call_1`, `call_2`, ...
    pub fn call_tools<I, S>(calls: I) -> Self
    where
        I: IntoIterator<Item = (S, serde_json::Value)>,
        S: Into<String>,
    {
        let calls = calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, args))| ToolCallRequest::new(format!("call_{}", i + 1), name, args))
            .collect();
        ScriptedTurn::Respond(LlmResponse::tool_calls(calls))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ScriptedTurn::Fail(message.into())
    }
}

/// Mock LLM for testing
///
/// Replays scripted turns in order; once the script is exhausted every
/// further call fails with a gateway error.
pub struct ScriptedLlm {
    name: String,
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        Self {
            name: "scripted".to_string(),
            turns: Mutex::new(turns.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a ScriptedLlm that answers once with the given text
    pub fn with_answer(text: impl Into<String>) -> Self {
        Self::new([ScriptedTurn::answer(text)])
    }

    /// Number of requests received so far
    pub fn calls(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        let turn = self
            .turns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        match turn {
            Some(ScriptedTurn::Respond(response)) => Ok(response),
            Some(ScriptedTurn::Fail(message)) => Err(Error::Gateway(message)),
            None => Err(Error::Gateway("scripted model has no turns left".to_string())),
        }
    }
}
