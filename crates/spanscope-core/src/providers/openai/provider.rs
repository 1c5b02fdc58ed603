//! OpenAI provider implementation

use super::{OpenAIConfig, types::*};
use crate::{
    ConversationMessage, Error, FinishReason, Llm, LlmRequest, LlmResponse, Result,
    ToolCallRequest, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;

/// OpenAI chat-completions client. One HTTP request per call, no retries.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: String, config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            config,
        }
    }

    /// Convert conversation history to OpenAI messages format
    fn convert_messages(messages: &[ConversationMessage]) -> Vec<OpenAIMessage> {
        messages
            .iter()
            .map(|message| {
                let tool_calls = if message.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        message
                            .tool_calls
                            .iter()
                            .map(|call| OpenAIToolCall {
                                id: call.id.clone(),
                                kind: "function".to_string(),
                                function: OpenAIFunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.to_string(),
                                },
                            })
                            .collect(),
                    )
                };

                OpenAIMessage {
                    role: message.role.as_str().to_string(),
                    content: message.content.clone(),
                    tool_calls,
                    tool_call_id: message.tool_call_id.clone(),
                    name: message.name.clone(),
                }
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool> {
        tools
            .iter()
            .map(|def| OpenAITool {
                kind: "function".to_string(),
                function: OpenAIFunctionDef {
                    name: def.name.clone(),
                    description: def.description.clone(),
                    parameters: def.parameters_schema(),
                },
            })
            .collect()
    }

    /// Convert the first choice of an OpenAI response to an [`LlmResponse`]
    fn convert_response(response: OpenAIResponse) -> Result<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Gateway("Response contained no choices".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                // Malformed argument JSON is kept verbatim so the registry can reject it
                let arguments = if call.function.arguments.trim().is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&call.function.arguments)
                        .unwrap_or(serde_json::Value::String(call.function.arguments))
                };
                ToolCallRequest::new(call.id, call.function.name, arguments)
            })
            .collect::<Vec<_>>();

        let finish_reason = match choice.finish_reason.as_deref() {
            Some(reason) => FinishReason::from(reason),
            None if !tool_calls.is_empty() => FinishReason::ToolCalls,
            None => FinishReason::Stop,
        };

        Ok(LlmResponse {
            finish_reason,
            content: choice.message.content,
            tool_calls,
        })
    }
}

#[async_trait]
impl Llm for OpenAIProvider {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let tools = Self::convert_tools(&request.tools);
        let openai_req = OpenAIRequest {
            model: request.model.clone(),
            messages: Self::convert_messages(&request.messages),
            tool_choice: (!tools.is_empty()).then(|| "auto".to_string()),
            tools,
        };

        tracing::debug!(
            model = %openai_req.model,
            messages = openai_req.messages.len(),
            tools = openai_req.tools.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_req)
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Gateway(format!(
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        let openai_resp = response
            .json::<OpenAIResponse>()
            .await
            .map_err(|e| Error::Gateway(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &openai_resp.usage {
            tracing::debug!(
                response_id = %openai_resp.id,
                model = %openai_resp.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Chat completion received"
            );
        }

        Self::convert_response(openai_resp)
    }
}
