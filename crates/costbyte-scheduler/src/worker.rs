//! Worker records: immutable identity plus lock-guarded runtime state.
//!
//! The roster is built once at startup and never grows or shrinks. The
//! dispatcher and the heartbeat monitor both mutate worker state, always
//! through the per-worker lock and never while a capability call is running.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use costbyte_core::config::WorkerConfig;
use costbyte_core::error::{CostByteError, Result};
use costbyte_core::types::Role;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Mutable part of a worker, read and written as one consistent triple.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerState {
    /// Last completed or attempted execution (or forced recovery).
    pub last_active: Option<DateTime<Utc>>,
    /// Execution attempts, successful or not.
    pub task_count: u64,
    /// Skipped by the dispatcher when false.
    pub is_active: bool,
    /// Set only by an operator; exempts the worker from forced reactivation.
    pub operator_disabled: bool,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self {
            last_active: None,
            task_count: 0,
            is_active: true,
            operator_disabled: false,
        }
    }
}

impl WorkerState {
    /// Move the heartbeat forward to `now`, never backwards.
    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active = Some(match self.last_active {
            Some(prev) if prev > now => prev,
            _ => now,
        });
    }

    fn record_attempt(&mut self, now: DateTime<Utc>) {
        self.task_count += 1;
        self.touch(now);
    }

    /// Age of the heartbeat if it is older than `threshold`.
    /// Workers that never ran and operator-disabled workers are never stale.
    fn staleness(&self, now: DateTime<Utc>, threshold: Duration) -> Option<Duration> {
        if self.operator_disabled {
            return None;
        }
        let last = self.last_active?;
        let age = now - last;
        (age > threshold).then_some(age)
    }
}

/// A named, role-typed worker.
#[derive(Debug)]
pub struct Worker {
    name: String,
    role: Role,
    version: String,
    state: Mutex<WorkerState>,
}

impl Worker {
    pub fn new(name: &str, role: Role, version: &str) -> Self {
        Self::with_state(name, role, version, WorkerState::default())
    }

    /// Rebuild a worker with previously observed state.
    pub fn with_state(name: &str, role: Role, version: &str, state: WorkerState) -> Self {
        Self {
            name: name.to_string(),
            role,
            version: version.to_string(),
            state: Mutex::new(state),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Consistent copy of the runtime state.
    pub async fn state(&self) -> WorkerState {
        self.state.lock().await.clone()
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.is_active
    }

    /// Count one execution attempt and refresh the heartbeat.
    pub async fn record_attempt(&self, now: DateTime<Utc>) -> WorkerState {
        let mut state = self.state.lock().await;
        state.record_attempt(now);
        state.clone()
    }

    /// Force-reactivate the worker if its heartbeat is older than `threshold`.
    /// Returns the observed age when a recovery happened.
    pub async fn revive_if_stalled(&self, now: DateTime<Utc>, threshold: Duration) -> Option<Duration> {
        let mut state = self.state.lock().await;
        let age = state.staleness(now, threshold)?;
        state.is_active = true;
        state.touch(now);
        Some(age)
    }

    /// Operator switch. Disabled workers stay down until re-enabled.
    pub async fn set_operator_disabled(&self, disabled: bool) {
        let mut state = self.state.lock().await;
        state.operator_disabled = disabled;
        state.is_active = !disabled;
    }

    pub async fn status(&self) -> WorkerStatus {
        let state = self.state().await;
        WorkerStatus {
            name: self.name.clone(),
            role: self.role.clone(),
            version: self.version.clone(),
            last_active: state.last_active.map(|t| t.to_rfc3339()),
            task_count: state.task_count,
            is_active: state.is_active,
            operator_disabled: state.operator_disabled,
        }
    }
}

/// Serializable status snapshot of one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub name: String,
    pub role: Role,
    pub version: String,
    pub last_active: Option<String>,
    pub task_count: u64,
    pub is_active: bool,
    pub operator_disabled: bool,
}

/// The fixed set of workers owned by the runtime.
#[derive(Debug)]
pub struct Roster {
    workers: Vec<Arc<Worker>>,
}

impl Roster {
    /// Build from explicit workers. Names must be non-empty and unique.
    pub fn new(workers: Vec<Worker>) -> Result<Self> {
        let mut seen = HashSet::new();
        for worker in &workers {
            if worker.name.trim().is_empty() {
                return Err(CostByteError::LoopFatal("worker with empty name in roster".into()));
            }
            if !seen.insert(worker.name.clone()) {
                return Err(CostByteError::LoopFatal(format!(
                    "duplicate worker name in roster: {}",
                    worker.name
                )));
            }
        }
        if workers.is_empty() {
            tracing::warn!("⚠️ Roster is empty, dispatcher will idle");
        }
        Ok(Self {
            workers: workers.into_iter().map(Arc::new).collect(),
        })
    }

    /// Build from the `[[workers]]` config table.
    pub fn from_config(entries: &[WorkerConfig]) -> Result<Self> {
        let workers = entries
            .iter()
            .map(|w| {
                let state = WorkerState {
                    is_active: w.enabled,
                    operator_disabled: !w.enabled,
                    ..WorkerState::default()
                };
                Worker::with_state(&w.name, w.role.clone(), &w.version, state)
            })
            .collect();
        let roster = Self::new(workers)?;
        for (w, entry) in roster.workers.iter().zip(entries) {
            if entry.enabled {
                tracing::info!("🤖 Worker registered: {} ({})", w.name, w.role);
            } else {
                tracing::info!("⏸️ Worker registered disabled: {} ({})", w.name, w.role);
            }
        }
        Ok(roster)
    }

    /// Workers in insertion order.
    pub fn snapshot(&self) -> Vec<Arc<Worker>> {
        self.workers.clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Worker>> {
        self.workers.iter().find(|w| w.name == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Operator-disable a worker.
    pub async fn disable(&self, name: &str) -> bool {
        match self.get(name) {
            Some(worker) => {
                worker.set_operator_disabled(true).await;
                tracing::info!("⏸️ Worker disabled by operator: {name}");
                true
            }
            None => false,
        }
    }

    /// Undo an operator disable.
    pub async fn enable(&self, name: &str) -> bool {
        match self.get(name) {
            Some(worker) => {
                worker.set_operator_disabled(false).await;
                tracing::info!("▶️ Worker enabled: {name}");
                true
            }
            None => false,
        }
    }

    /// Status of every worker, in roster order.
    pub async fn status(&self) -> Vec<WorkerStatus> {
        let mut out = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            out.push(worker.status().await);
        }
        out
    }
}
