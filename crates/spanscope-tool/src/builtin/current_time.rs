use crate::{FunctionTool, ToolSchema};
use chrono::{DateTime, Utc};
use spanscope_core::{ParameterType, Result, ToolResponse};

/// Creates the wall-clock tool. Only UTC is supported.
pub fn create_current_time_tool() -> Result<FunctionTool> {
    let definition = ToolSchema::new(
        "get_current_time",
        "Gets the current date and time. Returns datetime in various formats including ISO \
         format, date, time, and human-readable format.",
    )
    .property(
        "timezone",
        ParameterType::String,
        "The timezone name (default: UTC). Only UTC is supported.",
    )
    .default_value("timezone", serde_json::json!("UTC"))
    .build();

    FunctionTool::builder()
        .definition(definition)
        .execute(|ctx, params| async move {
            let requested = params["timezone"].as_str().unwrap_or("UTC").to_string();

            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                tool_call_id = %ctx.function_call_id(),
                timezone = %requested,
                "Reading current time"
            );

            Ok(ToolResponse {
                result: describe_time(Utc::now(), &requested),
            })
        })
        .build()
}

fn describe_time(now: DateTime<Utc>, requested: &str) -> serde_json::Value {
    let mut result = serde_json::json!({
        "success": true,
        "timezone": "UTC",
        "datetime": now.to_rfc3339(),
        "date": now.format("%Y-%m-%d").to_string(),
        "time": now.format("%H:%M:%S").to_string(),
        "formatted": now.format("%B %d, %Y at %I:%M:%S %p").to_string(),
    });

    if !requested.eq_ignore_ascii_case("UTC") {
        result["note"] = serde_json::Value::String(format!(
            "Timezone '{}' is not supported; time is reported in UTC",
            requested
        ));
    }

    result
}
