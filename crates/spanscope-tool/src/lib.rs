//! Tool system for SpanScope
//!
//! This crate provides the tool execution framework, including:
//! - Function tools built from a declared contract
//! - The registry that validates arguments and dispatches calls
//! - Built-in tools (calculate, get_current_time, get_random_fact)

pub mod builtin;
pub mod context;
pub mod function_tool;
pub mod registry;
pub mod schema;

// Re-exports
pub use builtin::default_registry;
pub use context::DefaultToolContext;
pub use function_tool::FunctionTool;
pub use registry::ToolRegistry;
pub use schema::ToolSchema;

// Re-export core types
pub use spanscope_core::{Result, Tool, ToolContext, ToolDefinition, ToolResponse};
