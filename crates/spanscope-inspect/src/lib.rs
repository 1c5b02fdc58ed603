//! Read-back validation of emitted traces
//!
//! [`TraceInspector`] waits for a trace to settle in the store, classifies
//! its observations, and checks them against an [`ExpectedShape`].

pub mod inspection;
pub mod inspector;
pub mod shape;

pub use inspection::{ObservationSummary, TraceInspection, classify};
pub use inspector::{MIN_POLL_INTERVAL, PollConfig, TraceInspector};
pub use shape::ExpectedShape;
