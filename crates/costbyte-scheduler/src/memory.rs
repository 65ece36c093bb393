//! In-memory log sink: bounded ring buffers, no persistence.
//! Used when no database is configured and as the assertion sink in tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use costbyte_core::error::{CostByteError, Result};
use costbyte_core::traits::LogSink;
use costbyte_core::types::{MetricSample, WorkerLogEntry};

const DEFAULT_CAPACITY: usize = 1000;

/// Ring-buffered sink. Oldest entries are dropped past `capacity`.
pub struct MemorySink {
    recoveries: Mutex<VecDeque<WorkerLogEntry>>,
    task_logs: Mutex<VecDeque<WorkerLogEntry>>,
    samples: Mutex<VecDeque<MetricSample>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            recoveries: Mutex::new(VecDeque::new()),
            task_logs: Mutex::new(VecDeque::new()),
            samples: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn recoveries(&self) -> Vec<WorkerLogEntry> {
        snapshot(&self.recoveries)
    }

    pub fn task_logs(&self) -> Vec<WorkerLogEntry> {
        snapshot(&self.task_logs)
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        snapshot(&self.samples)
    }

    fn push<T>(&self, buf: &Mutex<VecDeque<T>>, item: T) -> Result<()> {
        let mut buf = buf
            .lock()
            .map_err(|e| CostByteError::SinkWrite(format!("memory sink poisoned: {e}")))?;
        buf.push_back(item);
        while buf.len() > self.capacity {
            buf.pop_front();
        }
        Ok(())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot<T: Clone>(buf: &Mutex<VecDeque<T>>) -> Vec<T> {
    buf.lock()
        .map(|b| b.iter().cloned().collect())
        .unwrap_or_default()
}

#[async_trait]
impl LogSink for MemorySink {
    async fn append_recovery_event(&self, event: &WorkerLogEntry) -> Result<()> {
        self.push(&self.recoveries, event.clone())
    }

    async fn append_task_log(&self, entry: &WorkerLogEntry) -> Result<()> {
        self.push(&self.task_logs, entry.clone())
    }

    async fn write_metric_sample(&self, sample: &MetricSample) -> Result<()> {
        self.push(&self.samples, sample.clone())
    }
}
