use crate::builder::AgentBuilder;
use crate::run::{AgentRun, AgentState, RunError, RunRequest};
use serde_json::json;
use spanscope_core::{
    ConversationMessage, Error, Llm, LlmRequest, LlmResponse, Result, ToolCallRequest,
    ToolCallResult, ToolDefinition,
};
use spanscope_telemetry::{SpanGuard, SpanKind, TraceAttributes, Tracer};
use spanscope_tool::{DefaultToolContext, ToolRegistry};
use std::sync::Arc;
use tracing::Instrument;

/// Tags put on every trace unless the builder replaces them
pub const DEFAULT_TAGS: [&str; 3] = ["poc", "agent", "openai"];

/// Sequential tool-calling agent.
///
/// Every run is one trace: a root session span with an llm_call child per
/// model request and a tool_call child per dispatched tool.
pub struct Agent {
    pub(crate) name: String,
    pub(crate) model: Arc<dyn Llm>,
    pub(crate) model_name: String,
    pub(crate) registry: Arc<ToolRegistry>,
    pub(crate) tracer: Tracer,
    pub(crate) system_instruction: Option<String>,
    pub(crate) max_iterations: usize,
    pub(crate) tags: Vec<String>,
}

struct LoopOutcome {
    answer: String,
    iterations: usize,
    conversation: Vec<ConversationMessage>,
    tool_calls: Vec<ToolCallResult>,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Answer one query, tracing the whole run.
    ///
    /// Buffered spans are flushed before this returns, whether the run
    /// succeeded or not.
    pub async fn run(&self, request: RunRequest) -> std::result::Result<AgentRun, RunError> {
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(generate_session_id);

        let attrs = TraceAttributes::new(&self.name)
            .user_id(&request.user_id)
            .session_id(&session_id)
            .tags(self.tags.iter().cloned())
            .tags(request.tags.iter().cloned())
            .metadata("model", json!(self.model_name))
            .metadata("max_iterations", json!(self.max_iterations));

        let root = self
            .tracer
            .start_trace(attrs, json!({ "query": request.query }));
        let trace_id = root.trace_id().to_string();
        let trace_url = self.tracer.trace_url(&trace_id);

        tracing::info!(
            trace_id = %trace_id,
            session_id = %session_id,
            user_id = %request.user_id,
            model = %self.model_name,
            "Starting agent run"
        );

        let log_span = root.log_span().clone();
        let outcome = self
            .drive(&root, &request.query)
            .instrument(log_span)
            .await;

        match &outcome {
            Ok(done) => {
                tracing::info!(
                    trace_id = %trace_id,
                    session_id = %session_id,
                    iterations = done.iterations,
                    tool_calls = done.tool_calls.len(),
                    "Agent run completed"
                );
                root.end_ok(json!({
                    "answer": done.answer,
                    "iterations": done.iterations,
                }));
            }
            Err(e) => {
                tracing::error!(
                    trace_id = %trace_id,
                    session_id = %session_id,
                    error = %e,
                    "Agent run failed"
                );
                root.end_err(e);
            }
        }

        if let Err(e) = self.tracer.flush().await {
            tracing::warn!(trace_id = %trace_id, error = %e, "Failed to flush spans after run");
        }

        match outcome {
            Ok(done) => Ok(AgentRun {
                answer: done.answer,
                iterations: done.iterations,
                trace_id,
                trace_url,
                session_id,
                user_id: request.user_id,
                conversation: done.conversation,
                tool_calls: done.tool_calls,
            }),
            Err(error) => Err(RunError {
                error,
                trace_id,
                trace_url,
            }),
        }
    }

    async fn drive(&self, root: &SpanGuard, query: &str) -> Result<LoopOutcome> {
        let mut conversation = Vec::new();
        if let Some(instruction) = &self.system_instruction {
            conversation.push(ConversationMessage::system(instruction.clone()));
        }
        conversation.push(ConversationMessage::user(query));

        let definitions = self.registry.definitions();
        let mut tool_calls = Vec::new();
        let mut iterations = 0;
        let mut state = AgentState::AwaitingLlm;

        loop {
            state = match state {
                AgentState::AwaitingLlm => {
                    if iterations >= self.max_iterations {
                        return Err(Error::MaxIterationsExceeded(self.max_iterations));
                    }
                    iterations += 1;

                    let response = self
                        .call_llm(root, &conversation, &definitions, iterations)
                        .await?;

                    if response.wants_tools() {
                        conversation.push(ConversationMessage::assistant_tool_calls(
                            response.content.clone(),
                            response.tool_calls.clone(),
                        ));
                        AgentState::ExecutingTools(response.tool_calls)
                    } else {
                        let answer = response.content.unwrap_or_default();
                        conversation.push(ConversationMessage::assistant(answer.clone()));
                        AgentState::Done(answer)
                    }
                }
                AgentState::ExecutingTools(requests) => {
                    for request in requests {
                        let result = self.execute_tool(root, request).await;
                        conversation.push(ConversationMessage::tool_result(&result));
                        tool_calls.push(result);
                    }
                    AgentState::AwaitingLlm
                }
                AgentState::Done(answer) => {
                    return Ok(LoopOutcome {
                        answer,
                        iterations,
                        conversation,
                        tool_calls,
                    });
                }
            };
        }
    }

    async fn call_llm(
        &self,
        root: &SpanGuard,
        conversation: &[ConversationMessage],
        definitions: &[ToolDefinition],
        iteration: usize,
    ) -> Result<LlmResponse> {
        let tool_names: Vec<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
        let mut span = root.child(
            SpanKind::LlmCall,
            "call_llm",
            json!({
                "messages": conversation,
                "tools": tool_names,
            }),
        );
        span.set_model(&self.model_name);
        span.set_metadata("iteration", json!(iteration));

        let request = LlmRequest {
            model: self.model_name.clone(),
            messages: conversation.to_vec(),
            tools: definitions.to_vec(),
        };

        tracing::debug!(
            trace_id = %root.trace_id(),
            model = %self.model_name,
            iteration = iteration,
            messages = conversation.len(),
            "Calling LLM"
        );

        let log_span = span.log_span().clone();
        let result = self.model.complete(request).instrument(log_span).await;
        span.end_with(&result);

        match &result {
            Ok(response) => tracing::debug!(
                trace_id = %root.trace_id(),
                iteration = iteration,
                finish_reason = ?response.finish_reason,
                tool_calls = response.tool_calls.len(),
                "LLM call completed"
            ),
            Err(e) => tracing::error!(
                trace_id = %root.trace_id(),
                iteration = iteration,
                error = %e,
                "LLM call failed"
            ),
        }

        result
    }

    /// Dispatch one tool call. Failures become error-carrying results.
    async fn execute_tool(&self, root: &SpanGuard, request: ToolCallRequest) -> ToolCallResult {
        let trace_id = root.trace_id().to_string();
        let ToolCallRequest {
            id,
            name,
            arguments,
        } = request;

        tracing::debug!(
            trace_id = %trace_id,
            tool_name = %name,
            tool_call_id = %id,
            "Executing tool"
        );

        let ctx = Arc::new(DefaultToolContext::new(id.clone(), trace_id.clone()));
        let mut span = root.child(SpanKind::ToolCall, name.clone(), arguments.clone());
        span.set_metadata("tool_call_id", json!(id));
        let result = span
            .run(self.registry.dispatch(&name, arguments, ctx))
            .await;

        match result {
            Ok(output) => ToolCallResult::success(id, name, output),
            Err(e) => {
                tracing::warn!(
                    trace_id = %trace_id,
                    tool_name = %name,
                    tool_call_id = %id,
                    error = %e,
                    "Tool call failed, reporting error to the model"
                );
                ToolCallResult::failure(id, name, e.to_string())
            }
        }
    }
}

/// Short random session id, 8 hex characters
fn generate_session_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
