//! Dispatcher: the fixed-interval round-robin loop that runs every active worker.
//!
//! Each cycle walks the roster in insertion order. For every worker that was
//! active when the cycle started it builds the role payload, resolves the
//! capability, calls it under a timeout, then counts the attempt and refreshes
//! the heartbeat whatever the outcome. One worker's failure never touches
//! another worker's record.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use costbyte_core::error::{CostByteError, Result};
use costbyte_core::traits::{Clock, LogSink};
use costbyte_core::types::{TaskOutcome, TaskPayload, WorkerLogEntry};
use futures::FutureExt;

use crate::registry::CapabilityRegistry;
use crate::tasks;
use crate::ticker::{self, ShutdownSignal};
use crate::worker::{Roster, Worker};

/// Summary of one dispatcher cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub started_at: Option<DateTime<Utc>>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// The scheduler loop.
pub struct Dispatcher {
    roster: Arc<Roster>,
    registry: Arc<CapabilityRegistry>,
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    task_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        roster: Arc<Roster>,
        registry: Arc<CapabilityRegistry>,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
        task_timeout: Duration,
    ) -> Self {
        Self {
            roster,
            registry,
            sink,
            clock,
            task_timeout,
        }
    }

    /// One pass over the roster.
    pub async fn run_cycle(&self) -> DispatchReport {
        let mut report = DispatchReport {
            started_at: Some(self.clock.now()),
            ..DispatchReport::default()
        };

        // Active flags are read up front so a recovery landing mid-cycle
        // does not change who runs in this pass.
        let mut due = Vec::new();
        for worker in self.roster.snapshot() {
            if worker.is_active().await {
                due.push(worker);
            } else {
                report.skipped += 1;
            }
        }

        for worker in due {
            let payload = tasks::build_payload(worker.role());
            let outcome = self.execute(&worker, &payload).await;

            let now = self.clock.now();
            let state = worker.record_attempt(now).await;
            report.attempted += 1;

            let (task, details) = match &outcome {
                TaskOutcome::Success(result) => {
                    report.succeeded += 1;
                    tracing::info!(
                        "✅ {} completed task: {} (runs: {})",
                        worker.name(),
                        result.task,
                        state.task_count
                    );
                    (result.task.clone(), outcome.to_json().to_string())
                }
                TaskOutcome::Failed(e) => {
                    report.failed += 1;
                    tracing::warn!("⚠️ Task failed for {}: {e}", worker.name());
                    (tasks::task_label(worker.role()).to_string(), e.to_string())
                }
            };

            let entry = WorkerLogEntry {
                worker: worker.name().to_string(),
                task,
                status: outcome.status().to_string(),
                details,
                created_at: now,
            };
            if let Err(e) = self.sink.append_task_log(&entry).await {
                tracing::warn!("⚠️ Failed to write task log for {}: {e}", worker.name());
            }
        }

        tracing::debug!(
            "🔁 Dispatch cycle done: {} attempted, {} ok, {} failed, {} skipped",
            report.attempted,
            report.succeeded,
            report.failed,
            report.skipped
        );
        report
    }

    /// Resolve and call the worker's capability. Never panics, never errors:
    /// every failure mode comes back as `TaskOutcome::Failed`.
    async fn execute(&self, worker: &Worker, payload: &TaskPayload) -> TaskOutcome {
        let capability = match self.registry.resolve(worker.role()) {
            Ok(c) => c,
            Err(e) => return TaskOutcome::Failed(e),
        };

        let call = AssertUnwindSafe(capability.execute(payload)).catch_unwind();
        match tokio::time::timeout(self.task_timeout, call).await {
            Ok(Ok(Ok(result))) => TaskOutcome::Success(result),
            Ok(Ok(Err(CostByteError::Capability(msg)))) => {
                TaskOutcome::Failed(CostByteError::Capability(msg))
            }
            Ok(Ok(Err(other))) => TaskOutcome::Failed(CostByteError::Capability(other.to_string())),
            Ok(Err(_panic)) => TaskOutcome::Failed(CostByteError::Capability(format!(
                "capability '{}' panicked",
                capability.name()
            ))),
            Err(_elapsed) => TaskOutcome::Failed(CostByteError::Timeout(self.task_timeout)),
        }
    }

    /// Run cycles every `interval` until shutdown.
    pub async fn run(&self, interval: Duration, shutdown: ShutdownSignal) -> Result<()> {
        tracing::info!("🤖 Dispatcher managing {} workers", self.roster.len());
        ticker::run_periodic("dispatcher", interval, shutdown, || async {
            self.run_cycle().await;
            Ok(())
        })
        .await
    }
}
