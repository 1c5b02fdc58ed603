//! Tool-calling agent loop for SpanScope

pub mod agent;
pub mod builder;
pub mod run;
pub mod testing;

pub use agent::{Agent, DEFAULT_TAGS};
pub use builder::AgentBuilder;
pub use run::{AgentRun, AgentState, RunError, RunRequest};
