//! Log-side mirrors of instrumented spans and serialization helpers

use crate::attributes::*;
use crate::span::{SpanContext, SpanKind, TraceAttributes};

/// Create the `tracing` span that mirrors an instrumented boundary.
///
/// Fields that are only known on close (`spanscope.status`, `spanscope.error`)
/// are declared empty and recorded by the guard when the span ends.
pub(crate) fn log_span(
    kind: SpanKind,
    name: &str,
    context: &SpanContext,
    parent_id: Option<&str>,
    attrs: &TraceAttributes,
) -> tracing::Span {
    let parent_id = parent_id.unwrap_or_default();
    match kind {
        SpanKind::Session => tracing::info_span!(
            "agent_session",
            otel.name = %name,
            { GEN_AI_SYSTEM } = SYSTEM_NAME,
            { GEN_AI_OPERATION_NAME } = "invoke_agent",
            { SPANSCOPE_TRACE_ID } = %context.trace_id,
            { SPANSCOPE_SPAN_ID } = %context.span_id,
            { SPANSCOPE_SESSION_ID } = %attrs.session_id,
            { SPANSCOPE_USER_ID } = %attrs.user_id,
            { SPANSCOPE_STATUS } = tracing::field::Empty,
            { SPANSCOPE_ERROR } = tracing::field::Empty,
        ),
        SpanKind::LlmCall => tracing::info_span!(
            "call_llm",
            otel.name = %name,
            { GEN_AI_SYSTEM } = SYSTEM_NAME,
            { GEN_AI_OPERATION_NAME } = "chat",
            { GEN_AI_REQUEST_MODEL } = tracing::field::Empty,
            { SPANSCOPE_TRACE_ID } = %context.trace_id,
            { SPANSCOPE_SPAN_ID } = %context.span_id,
            { SPANSCOPE_PARENT_ID } = %parent_id,
            { SPANSCOPE_STATUS } = tracing::field::Empty,
            { SPANSCOPE_ERROR } = tracing::field::Empty,
        ),
        SpanKind::ToolCall => tracing::info_span!(
            "execute_tool",
            otel.name = %name,
            { GEN_AI_OPERATION_NAME } = "execute_tool",
            { GEN_AI_TOOL_NAME } = %name,
            { GEN_AI_TOOL_CALL_ID } = tracing::field::Empty,
            { SPANSCOPE_TRACE_ID } = %context.trace_id,
            { SPANSCOPE_SPAN_ID } = %context.span_id,
            { SPANSCOPE_PARENT_ID } = %parent_id,
            { SPANSCOPE_STATUS } = tracing::field::Empty,
            { SPANSCOPE_ERROR } = tracing::field::Empty,
        ),
    }
}

/// Helper to safely serialize to JSON string
pub fn safe_serialize<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<not serializable>".to_string())
}

/// Helper to convert a value to JSON for span input/output payloads
pub fn to_json_value<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value)
        .unwrap_or_else(|_| serde_json::Value::String("<not serializable>".to_string()))
}
