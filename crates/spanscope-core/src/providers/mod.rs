//! LLM gateway implementations
//!
//! Every provider implements the [`Llm`](crate::Llm) trait: one request in,
//! one assistant turn out. Retrying is left to the caller.

pub mod openai;

pub use openai::{OpenAIBuilder, OpenAIConfig, OpenAIProvider};
