//! Core traits and types for SpanScope
//!
//! This crate provides the conversation model, the LLM and tool abstractions,
//! the shared error taxonomy, configuration, and the OpenAI gateway.

pub mod config;
pub mod content;
pub mod context;
pub mod error;
pub mod providers;
pub mod traits;

// Re-exports
pub use config::{AgentConfig, InspectorConfig, ModelConfig, SpanScopeConfig, TracingConfig};
pub use content::{ConversationMessage, Role, ToolCallRequest, ToolCallResult};
pub use context::ToolContext;
pub use error::{Error, Result};
pub use providers::{OpenAIBuilder, OpenAIConfig, OpenAIProvider};
pub use traits::{
    FinishReason, Llm, LlmRequest, LlmResponse, ParameterSpec, ParameterType, Tool,
    ToolDefinition, ToolResponse,
};
