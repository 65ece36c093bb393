//! Log/metric sink: where recovery events, task logs and samples go.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{MetricSample, WorkerLogEntry};

/// Append-only store for worker logs and telemetry samples.
///
/// Callers treat every method as fire-and-forget: errors are logged and
/// never retried within the same cycle.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Record a heartbeat recovery (`health_check` / `restarted`).
    async fn append_recovery_event(&self, event: &WorkerLogEntry) -> Result<()>;

    /// Record one task execution attempt.
    async fn append_task_log(&self, _entry: &WorkerLogEntry) -> Result<()> {
        Ok(())
    }

    /// Persist one telemetry sample.
    async fn write_metric_sample(&self, sample: &MetricSample) -> Result<()>;

    /// Cheap liveness check of the backing store.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
