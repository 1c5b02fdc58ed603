//! Tracing for agent runs
//!
//! Spans are opened through an explicitly constructed [`Tracer`], closed
//! exactly once by their [`SpanGuard`], and exported to a [`TraceStore`]
//! (Langfuse or in-memory) on flush. Every span is mirrored as a `tracing`
//! span so the same structure shows up in the logs.

pub mod attributes;
pub mod span;
pub mod spans;
pub mod store;
pub mod tracer;

pub use span::{Span, SpanContext, SpanKind, SpanStatus, TraceAttributes};
pub use spans::{safe_serialize, to_json_value};
pub use store::{
    IngestionDelay, InMemoryStore, LangfuseConfig, LangfuseStore, Observation, TraceStore,
    create_store,
};
pub use tracer::{SpanGuard, SpanHandle, Tracer, init_logging};
