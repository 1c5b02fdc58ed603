/// Tool context provided during tool execution
pub trait ToolContext: Send + Sync {
    fn function_call_id(&self) -> &str;

    /// Trace id of the agent run that issued the call
    fn invocation_id(&self) -> &str;
}
