//! Heartbeat monitor: detects stalled workers and force-reactivates them.

use std::sync::Arc;
use std::time::Duration;

use costbyte_core::error::Result;
use costbyte_core::traits::{Clock, LogSink};
use costbyte_core::types::WorkerLogEntry;

use crate::ticker::{self, ShutdownSignal};
use crate::worker::Roster;

/// Result of one monitor sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthReport {
    pub checked: usize,
    pub recovered: Vec<String>,
}

pub struct HeartbeatMonitor {
    roster: Arc<Roster>,
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    threshold: chrono::Duration,
}

impl HeartbeatMonitor {
    pub fn new(
        roster: Arc<Roster>,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
        threshold: chrono::Duration,
    ) -> Self {
        Self {
            roster,
            sink,
            clock,
            threshold,
        }
    }

    /// Sweep every worker once. A worker is stale when its heartbeat is
    /// strictly older than the threshold; workers that never ran are skipped.
    pub async fn run_cycle(&self) -> HealthReport {
        let mut report = HealthReport::default();

        for worker in self.roster.snapshot() {
            report.checked += 1;
            let now = self.clock.now();
            let Some(age) = worker.revive_if_stalled(now, self.threshold).await else {
                continue;
            };

            tracing::warn!(
                "⚠️ AI helper {} is not responding (silent for {}s)",
                worker.name(),
                age.num_seconds()
            );

            let event = WorkerLogEntry::recovery(
                worker.name(),
                &format!(
                    "Helper was not responding for {}s and has been restarted",
                    age.num_seconds()
                ),
                now,
            );
            if let Err(e) = self.sink.append_recovery_event(&event).await {
                tracing::error!("❌ Failed to record recovery of {}: {e}", worker.name());
            }
            tracing::info!("🔄 {} restarted", worker.name());
            report.recovered.push(worker.name().to_string());
        }

        if report.recovered.is_empty() {
            tracing::debug!("💓 All {} workers healthy", report.checked);
        }
        report
    }

    pub async fn run(&self, interval: Duration, shutdown: ShutdownSignal) -> Result<()> {
        ticker::run_periodic("heartbeat monitor", interval, shutdown, || async {
            self.run_cycle().await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;
    use crate::worker::{Worker, WorkerState};
    use chrono::Utc;
    use costbyte_core::traits::ManualClock;
    use costbyte_core::types::Role;

    fn stale_worker(name: &str, silent_for: chrono::Duration, now: chrono::DateTime<Utc>) -> Worker {
        Worker::with_state(
            name,
            Role::EmailMarketer,
            "1.0.0",
            WorkerState {
                last_active: Some(now - silent_for),
                task_count: 4,
                is_active: false,
                operator_disabled: false,
            },
        )
    }

    #[tokio::test]
    async fn test_stale_worker_recovered() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let roster = Arc::new(
            Roster::new(vec![stale_worker("MailBot", chrono::Duration::hours(2), now)]).unwrap(),
        );
        let sink = Arc::new(MemorySink::new());
        let monitor = HeartbeatMonitor::new(roster.clone(), sink.clone(), clock, chrono::Duration::hours(1));

        let report = monitor.run_cycle().await;
        assert_eq!(report.recovered, vec!["MailBot".to_string()]);

        let state = roster.get("MailBot").unwrap().state().await;
        assert!(state.is_active);
        assert_eq!(state.last_active, Some(now));
        assert_eq!(state.task_count, 4);

        let events = sink.recoveries();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].worker, "MailBot");
        assert_eq!(events[0].task, WorkerLogEntry::HEALTH_CHECK);
        assert_eq!(events[0].status, WorkerLogEntry::RESTARTED);
        assert!(events[0].details.contains("7200s"));
    }

    #[tokio::test]
    async fn test_exactly_at_threshold_is_not_stale() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let roster = Arc::new(
            Roster::new(vec![stale_worker("MailBot", chrono::Duration::hours(1), now)]).unwrap(),
        );
        let sink = Arc::new(MemorySink::new());
        let monitor = HeartbeatMonitor::new(roster.clone(), sink.clone(), clock, chrono::Duration::hours(1));

        let report = monitor.run_cycle().await;
        assert!(report.recovered.is_empty());
        assert!(sink.recoveries().is_empty());
        assert!(!roster.get("MailBot").unwrap().is_active().await);
    }

    #[tokio::test]
    async fn test_never_run_workers_ignored() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = costbyte_core::CostByteConfig::default();
        let roster = Arc::new(Roster::from_config(&config.workers).unwrap());
        let sink = Arc::new(MemorySink::new());
        let monitor = HeartbeatMonitor::new(roster, sink.clone(), clock.clone(), chrono::Duration::hours(1));

        clock.advance(chrono::Duration::days(2));
        let report = monitor.run_cycle().await;
        assert_eq!(report.checked, 8);
        assert!(report.recovered.is_empty());
        assert!(sink.recoveries().is_empty());
    }

    #[tokio::test]
    async fn test_recovery_is_not_repeated_next_sweep() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let roster = Arc::new(
            Roster::new(vec![stale_worker("MailBot", chrono::Duration::hours(3), now)]).unwrap(),
        );
        let sink = Arc::new(MemorySink::new());
        let monitor = HeartbeatMonitor::new(roster, sink.clone(), clock.clone(), chrono::Duration::hours(1));

        monitor.run_cycle().await;
        clock.advance(chrono::Duration::minutes(5));
        let report = monitor.run_cycle().await;
        assert!(report.recovered.is_empty());
        assert_eq!(sink.recoveries().len(), 1);
    }

    #[tokio::test]
    async fn test_operator_disabled_worker_left_alone() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let roster = Arc::new(
            Roster::new(vec![stale_worker("MailBot", chrono::Duration::hours(6), now)]).unwrap(),
        );
        roster.disable("MailBot").await;
        let sink = Arc::new(MemorySink::new());
        let monitor = HeartbeatMonitor::new(roster.clone(), sink.clone(), clock, chrono::Duration::hours(1));

        let report = monitor.run_cycle().await;
        assert!(report.recovered.is_empty());
        assert!(!roster.get("MailBot").unwrap().is_active().await);
    }

    #[tokio::test]
    async fn test_fresh_worker_sweeps_are_idempotent() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let fresh = Worker::with_state(
            "ContentBot",
            Role::ContentCreator,
            "1.0.0",
            WorkerState {
                last_active: Some(now),
                task_count: 2,
                is_active: true,
                operator_disabled: false,
            },
        );
        let roster = Arc::new(Roster::new(vec![fresh]).unwrap());
        let sink = Arc::new(MemorySink::new());
        let monitor = HeartbeatMonitor::new(roster.clone(), sink.clone(), clock, chrono::Duration::hours(1));

        let before = roster.get("ContentBot").unwrap().state().await;
        let first = monitor.run_cycle().await;
        let second = monitor.run_cycle().await;
        let after = roster.get("ContentBot").unwrap().state().await;

        assert!(first.recovered.is_empty());
        assert!(second.recovered.is_empty());
        assert_eq!(before, after);
        assert!(sink.recoveries().is_empty());
    }
}
