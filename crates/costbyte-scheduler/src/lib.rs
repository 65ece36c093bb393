//! # CostByte Scheduler
//!
//! Runs a fixed roster of role-typed AI workers on a recurring schedule,
//! notices when one goes silent and brings it back, and records telemetry
//! on its own cadence.
//!
//! ## Architecture
//! ```text
//! WorkerRuntime
//!   ├── Dispatcher (every scheduler.interval_secs)
//!   │     └── for each active worker: payload → capability (timeout) → record attempt
//!   ├── HeartbeatMonitor (every monitor.interval_secs)
//!   │     └── last_active older than threshold → reactivate + recovery event
//!   └── TelemetryRecorder (every telemetry.interval_secs)
//!         └── health check → one sample per configured metric
//!
//! LogSink: SqliteSink (ai_helper_logs, analytics) or MemorySink
//! ```
//!
//! Loops share nothing but the roster; each worker's state sits behind its
//! own lock, so a slow capability call never blocks the monitor.

pub mod engine;
pub mod memory;
pub mod monitor;
pub mod persistence;
pub mod registry;
pub mod runtime;
pub mod tasks;
pub mod telemetry;
pub mod ticker;
pub mod worker;

pub use engine::{DispatchReport, Dispatcher};
pub use memory::MemorySink;
pub use monitor::{HealthReport, HeartbeatMonitor};
pub use persistence::SqliteSink;
pub use registry::CapabilityRegistry;
pub use runtime::{CycleSummary, RuntimeHandle, WorkerRuntime};
pub use telemetry::{StaticMetricSource, TelemetryRecorder, TelemetryReport, period_label};
pub use ticker::{Shutdown, ShutdownSignal, run_periodic};
pub use worker::{Roster, Worker, WorkerState, WorkerStatus};
