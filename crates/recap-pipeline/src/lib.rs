//! Job coordination and story aggregation.
//!
//! This crate provides:
//! - `JobCoordinator`: validation, queue admission and terminal messages
//! - `AggregationPipeline`: per-subject fetch, summarize, fold and record
//! - `ProgressSink`: the bounded stream of messages back to the caller

pub mod aggregator;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod prompt;
pub mod session;
pub mod sink;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use aggregator::{AggregationPipeline, Collaborators, PipelineOutput};
pub use config::PipelineConfig;
pub use coordinator::{JobCoordinator, SubmitOutcome};
pub use error::{PipelineError, PipelineResult, JOB_FAILED_MESSAGE};
pub use logging::JobLogger;
pub use sink::ProgressSink;
