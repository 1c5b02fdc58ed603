use async_trait::async_trait;
use serde_json::Value;
use spanscope_core::{Result, Tool, ToolContext, ToolDefinition, ToolResponse};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for tool execution function
pub type ToolFn = Box<
    dyn Fn(
            Arc<dyn ToolContext>,
            Value,
        ) -> Pin<Box<dyn Future<Output = Result<ToolResponse>> + Send>>
        + Send
        + Sync,
>;

/// A function-based tool implementation
pub struct FunctionTool {
    definition: ToolDefinition,
    execute_fn: ToolFn,
}

impl FunctionTool {
    pub fn builder() -> FunctionToolBuilder {
        FunctionToolBuilder::new()
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("definition", &self.definition)
            .finish()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, params: Value) -> Result<ToolResponse> {
        (self.execute_fn)(ctx, params).await
    }
}

/// Builder for FunctionTool
pub struct FunctionToolBuilder {
    definition: Option<ToolDefinition>,
    execute_fn: Option<ToolFn>,
}

impl FunctionToolBuilder {
    pub fn new() -> Self {
        Self {
            definition: None,
            execute_fn: None,
        }
    }

    pub fn definition(mut self, definition: ToolDefinition) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn execute<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<dyn ToolContext>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse>> + Send + 'static,
    {
        self.execute_fn = Some(Box::new(move |ctx, params| Box::pin(f(ctx, params))));
        self
    }

    pub fn build(self) -> Result<FunctionTool> {
        let definition = self.definition.ok_or_else(|| {
            spanscope_core::Error::Other(anyhow::anyhow!("Tool definition is required"))
        })?;
        if definition.name.is_empty() {
            return Err(spanscope_core::Error::Other(anyhow::anyhow!(
                "Tool name is required"
            )));
        }

        Ok(FunctionTool {
            definition,
            execute_fn: self.execute_fn.ok_or_else(|| {
                spanscope_core::Error::Other(anyhow::anyhow!("Tool execute function is required"))
            })?,
        })
    }
}

impl Default for FunctionToolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
