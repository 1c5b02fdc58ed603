use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Tool '{tool}' execution failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("LLM gateway error: {0}")]
    Gateway(String),

    #[error("Maximum iterations ({0}) reached without a final answer")]
    MaxIterationsExceeded(usize),

    #[error("Trace {trace_id} not found after waiting {waited_ms}ms")]
    TraceNotFound { trace_id: String, waited_ms: u128 },

    #[error("Trace {trace_id} does not match the expected shape: {}", violations.join("; "))]
    ShapeMismatch {
        trace_id: String,
        violations: Vec<String>,
    },

    #[error("Trace store error: {0}")]
    TraceStore(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use spanscope_core::Error;
    /// let err = Error::config_error("Missing LANGFUSE_SECRET_KEY");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating general errors with a message
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }

    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Tool-level failures are recovered by the agent loop and fed back to the model.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnknownTool(_) | Error::InvalidArguments { .. } | Error::ToolExecution { .. }
        )
    }
}
