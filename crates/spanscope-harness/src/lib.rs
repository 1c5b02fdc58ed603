//! Canned scenarios and the wiring that runs them
//!
//! A [`Harness`] builds the agent, tracer and inspector from configuration
//! (scripted model and in-memory store when mocked, OpenAI and Langfuse
//! otherwise), runs scenarios, and reports whether each trace has the
//! expected shape.

pub mod harness;
pub mod report;
pub mod scenario;

pub use harness::{Harness, auth_check};
pub use report::{HarnessSummary, ScenarioReport, ScenarioVerdict};
pub use scenario::{CANNED_PROMPTS, Scenario, find_scenario, fixed_scenarios, script_for_query};
