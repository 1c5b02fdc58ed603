//! Built-in tools for common operations

pub mod calculate;
pub mod current_time;
pub mod random_fact;

pub use calculate::create_calculate_tool;
pub use current_time::create_current_time_tool;
pub use random_fact::create_random_fact_tool;

use crate::registry::ToolRegistry;
use spanscope_core::Result;
use std::sync::Arc;

/// Registry holding every built-in tool
pub fn default_registry() -> Result<ToolRegistry> {
    ToolRegistry::new()
        .with_tool(Arc::new(create_calculate_tool()?))?
        .with_tool(Arc::new(create_current_time_tool()?))?
        .with_tool(Arc::new(create_random_fact_tool()?))
}
