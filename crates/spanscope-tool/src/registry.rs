//! Name-indexed tool dispatch with contract validation

use serde_json::Value;
use spanscope_core::{Error, Result, Tool, ToolContext, ToolDefinition};
use std::sync::Arc;

/// Ordered set of tools, registered once at startup
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        if self.get(tool.name()).is_some() {
            return Err(Error::config_error(format!(
                "Tool '{}' is already registered",
                tool.name()
            )));
        }
        tracing::debug!(tool_name = %tool.name(), "Registered tool");
        self.tools.push(tool);
        Ok(())
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Definitions in registration order, as advertised to the LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition().clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate arguments and run the named tool, returning its serialized output
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Value,
        ctx: Arc<dyn ToolContext>,
    ) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        let params = validate_arguments(tool.definition(), arguments)?;

        tracing::debug!(
            tool_name = %name,
            tool_call_id = %ctx.function_call_id(),
            "Dispatching tool call"
        );

        match tool.execute(ctx, params).await {
            Ok(response) => Ok(serde_json::to_string(&response.result)?),
            Err(e @ Error::ToolExecution { .. }) => Err(e),
            Err(e @ Error::InvalidArguments { .. }) => Err(e),
            Err(other) => Err(Error::tool_execution(name, other.to_string())),
        }
    }
}

/// Check arguments against a tool's contract and fill in declared defaults
fn validate_arguments(definition: &ToolDefinition, arguments: Value) -> Result<Value> {
    let mut args = match arguments {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            return Err(Error::invalid_arguments(
                &definition.name,
                format!("expected a JSON object, got {}", json_type_name(&other)),
            ));
        }
    };

    for (param, spec) in &definition.parameters {
        match args.get(param) {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(Error::invalid_arguments(
                        &definition.name,
                        format!("missing required parameter '{}'", param),
                    ));
                }
                if let Some(default) = &spec.default {
                    args.insert(param.clone(), default.clone());
                }
            }
            Some(value) => {
                if !spec.param_type.matches(value) {
                    return Err(Error::invalid_arguments(
                        &definition.name,
                        format!(
                            "parameter '{}' must be of type {}, got {}",
                            param,
                            spec.param_type.as_str(),
                            json_type_name(value)
                        ),
                    ));
                }
                if let (Some(allowed), Some(text)) = (&spec.allowed, value.as_str()) {
                    // Enum values match case-insensitively and are passed on in canonical form
                    match allowed.iter().find(|a| a.eq_ignore_ascii_case(text)) {
                        Some(canonical) => {
                            if canonical != text {
                                args.insert(param.clone(), Value::String(canonical.clone()));
                            }
                        }
                        None => {
                            return Err(Error::invalid_arguments(
                                &definition.name,
                                format!(
                                    "parameter '{}' must be one of [{}], got '{}'",
                                    param,
                                    allowed.join(", "),
                                    text
                                ),
                            ));
                        }
                    }
                }
            }
        }
    }

    Ok(Value::Object(args))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
