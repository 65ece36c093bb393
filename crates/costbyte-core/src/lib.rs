//! # CostByte Core
//!
//! Shared building blocks for the CostByte worker runtime: configuration,
//! the error taxonomy, role/payload/outcome types and the traits that sit at
//! the seams between the scheduler and its external collaborators.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::CostByteConfig;
pub use error::{CostByteError, Result};
pub use traits::{Capability, Clock, LogSink, ManualClock, MetricSource, SystemClock};
pub use types::{MetricSample, Role, TaskOutcome, TaskPayload, TaskResult, WorkerLogEntry};
