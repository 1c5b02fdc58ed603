//! Attribute keys for instrumented spans.
//!
//! GenAI keys follow the OpenTelemetry semantic conventions for generative AI.

pub const SYSTEM_NAME: &str = "spanscope";

pub const GEN_AI_SYSTEM: &str = "gen_ai.system";
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";
pub const GEN_AI_TOOL_NAME: &str = "gen_ai.tool.name";
pub const GEN_AI_TOOL_CALL_ID: &str = "gen_ai.tool.call.id";

pub const SPANSCOPE_TRACE_ID: &str = "spanscope.trace_id";
pub const SPANSCOPE_SPAN_ID: &str = "spanscope.span_id";
pub const SPANSCOPE_PARENT_ID: &str = "spanscope.parent_id";
pub const SPANSCOPE_SESSION_ID: &str = "spanscope.session_id";
pub const SPANSCOPE_USER_ID: &str = "spanscope.user_id";
pub const SPANSCOPE_STATUS: &str = "spanscope.status";
pub const SPANSCOPE_ERROR: &str = "spanscope.error";
