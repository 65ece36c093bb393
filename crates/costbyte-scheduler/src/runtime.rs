//! Worker runtime: owns the roster and drives the three background loops.

use std::sync::Arc;
use std::time::Duration;

use costbyte_core::config::CostByteConfig;
use costbyte_core::error::{CostByteError, Result};
use costbyte_core::traits::{Clock, LogSink, MetricSource};
use futures::future::select_all;
use tokio::task::JoinHandle;

use crate::engine::{DispatchReport, Dispatcher};
use crate::monitor::{HealthReport, HeartbeatMonitor};
use crate::registry::CapabilityRegistry;
use crate::telemetry::{StaticMetricSource, TelemetryRecorder, TelemetryReport};
use crate::ticker::Shutdown;
use crate::worker::{Roster, WorkerStatus};

/// One cycle of every loop, as run by `run_once`.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub dispatch: DispatchReport,
    pub health: HealthReport,
    pub telemetry: TelemetryReport,
}

pub struct WorkerRuntime {
    roster: Arc<Roster>,
    dispatcher: Arc<Dispatcher>,
    monitor: Arc<HeartbeatMonitor>,
    recorder: Arc<TelemetryRecorder>,
    dispatch_every: Duration,
    monitor_every: Duration,
    telemetry_every: Duration,
}

impl WorkerRuntime {
    /// Build the runtime with metrics read from the `[telemetry]` table.
    pub fn new(
        config: &CostByteConfig,
        registry: CapabilityRegistry,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let source = Arc::new(StaticMetricSource::new(&config.telemetry.metrics));
        Self::with_metric_source(config, registry, sink, clock, source)
    }

    pub fn with_metric_source(
        config: &CostByteConfig,
        registry: CapabilityRegistry,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
        source: Arc<dyn MetricSource>,
    ) -> Result<Self> {
        config.validate()?;
        let roster = Arc::new(Roster::from_config(&config.workers)?);

        for worker in roster.snapshot() {
            if !registry.contains(worker.role()) {
                tracing::warn!(
                    "⚠️ No capability for {} (role {}), its runs will fail",
                    worker.name(),
                    worker.role()
                );
            }
        }

        let dispatcher = Dispatcher::new(
            roster.clone(),
            Arc::new(registry),
            sink.clone(),
            clock.clone(),
            config.scheduler.task_timeout(),
        );
        let monitor = HeartbeatMonitor::new(
            roster.clone(),
            sink.clone(),
            clock.clone(),
            config.monitor.staleness_threshold()?,
        );
        let recorder = TelemetryRecorder::new(
            config.telemetry.metrics.iter().map(|m| m.name.clone()).collect(),
            &config.telemetry.metric_type,
            config.telemetry.interval(),
            source,
            sink,
            clock,
        );

        Ok(Self {
            roster,
            dispatcher: Arc::new(dispatcher),
            monitor: Arc::new(monitor),
            recorder: Arc::new(recorder),
            dispatch_every: config.scheduler.interval(),
            monitor_every: config.monitor.interval(),
            telemetry_every: config.telemetry.interval(),
        })
    }

    pub fn roster(&self) -> Arc<Roster> {
        self.roster.clone()
    }

    pub async fn status(&self) -> Vec<WorkerStatus> {
        self.roster.status().await
    }

    /// Run exactly one cycle of each loop, dispatcher first.
    pub async fn run_once(&self) -> CycleSummary {
        let dispatch = self.dispatcher.run_cycle().await;
        let health = self.monitor.run_cycle().await;
        let telemetry = self.recorder.run_cycle().await;
        CycleSummary {
            dispatch,
            health,
            telemetry,
        }
    }

    /// Spawn the three loops. They run until `RuntimeHandle::stop`, or until
    /// one of them fails fatally (see `RuntimeHandle::first_exit`).
    pub fn start(&self) -> RuntimeHandle {
        let shutdown = Shutdown::new();
        tracing::info!(
            "🚀 Starting {} workers (dispatch {}s, monitor {}s, telemetry {})",
            self.roster.len(),
            self.dispatch_every.as_secs(),
            self.monitor_every.as_secs(),
            self.recorder.period()
        );

        let dispatcher = self.dispatcher.clone();
        let signal = shutdown.signal();
        let every = self.dispatch_every;
        let dispatch = tokio::spawn(async move { dispatcher.run(every, signal).await });

        let monitor = self.monitor.clone();
        let signal = shutdown.signal();
        let every = self.monitor_every;
        let health = tokio::spawn(async move { monitor.run(every, signal).await });

        let recorder = self.recorder.clone();
        let signal = shutdown.signal();
        let every = self.telemetry_every;
        let telemetry = tokio::spawn(async move { recorder.run(every, signal).await });

        RuntimeHandle::new(
            shutdown,
            vec![
                ("dispatcher", dispatch),
                ("heartbeat monitor", health),
                ("telemetry", telemetry),
            ],
        )
    }
}

/// Handle to the running loops.
pub struct RuntimeHandle {
    shutdown: Shutdown,
    tasks: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

impl RuntimeHandle {
    pub(crate) fn new(shutdown: Shutdown, tasks: Vec<(&'static str, JoinHandle<Result<()>>)>) -> Self {
        Self { shutdown, tasks }
    }

    /// Resolves when the first loop exits without being asked to, with the
    /// loop's name and outcome. A panicked or cancelled loop task is reported
    /// as `LoopFatal`. The exited loop is no longer awaited by `stop`.
    ///
    /// Never resolves while every loop is healthy.
    pub async fn first_exit(&mut self) -> (&'static str, Result<()>) {
        if self.tasks.is_empty() {
            return std::future::pending().await;
        }
        let (joined, index, _) = select_all(self.tasks.iter_mut().map(|(_, task)| task)).await;
        let (name, _) = self.tasks.remove(index);
        let outcome = match joined {
            Ok(Ok(())) => {
                tracing::warn!("⚠️ {name} loop exited");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!("❌ {name} loop ended with error: {e}");
                Err(e)
            }
            Err(e) => {
                tracing::error!("❌ {name} loop task failed: {e}");
                Err(CostByteError::LoopFatal(format!("{name}: {e}")))
            }
        };
        (name, outcome)
    }

    /// Signal every loop and wait for them to finish their current cycle.
    /// Returns the first loop error, if any loop ended with one.
    pub async fn stop(self) -> Result<()> {
        self.shutdown.trigger();
        let mut first_err = None;
        for (name, task) in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!("❌ {name} loop ended with error: {e}");
                    first_err.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!("❌ {name} loop task failed: {e}");
                    first_err.get_or_insert(CostByteError::LoopFatal(format!("{name}: {e}")));
                }
            }
        }
        tracing::info!("🛑 Worker runtime stopped");
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;
    use crate::ticker::run_periodic;
    use async_trait::async_trait;
    use chrono::Utc;
    use costbyte_core::traits::{Capability, ManualClock};
    use costbyte_core::types::{Role, TaskPayload, TaskResult};

    struct Noop;

    #[async_trait]
    impl Capability for Noop {
        fn name(&self) -> &str {
            "noop"
        }
        async fn execute(&self, _payload: &TaskPayload) -> Result<TaskResult> {
            Ok(TaskResult::new("noop"))
        }
    }

    fn full_registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        for role in Role::BUILTIN {
            registry.register(role, Arc::new(Noop));
        }
        registry
    }

    #[tokio::test]
    async fn test_run_once_touches_every_loop() {
        let config = CostByteConfig::default();
        let sink = Arc::new(MemorySink::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let runtime = WorkerRuntime::new(&config, full_registry(), sink.clone(), clock).unwrap();

        let summary = runtime.run_once().await;
        assert_eq!(summary.dispatch.attempted, 8);
        assert_eq!(summary.dispatch.succeeded, 8);
        assert_eq!(summary.health.checked, 8);
        assert!(summary.health.recovered.is_empty());
        assert_eq!(summary.telemetry.written, 5);

        assert_eq!(sink.task_logs().len(), 8);
        let status = runtime.status().await;
        assert!(status.iter().all(|s| s.task_count == 1 && s.last_active.is_some()));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = CostByteConfig::default();
        config.scheduler.task_timeout_secs = 0;
        let result = WorkerRuntime::new(
            &config,
            full_registry(),
            Arc::new(MemorySink::new()),
            Arc::new(ManualClock::new(Utc::now())),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let config = CostByteConfig::default();
        let sink = Arc::new(MemorySink::new());
        let runtime = WorkerRuntime::new(
            &config,
            full_registry(),
            sink.clone(),
            Arc::new(ManualClock::new(Utc::now())),
        )
        .unwrap();

        let mut handle = runtime.start();
        let early = tokio::time::timeout(Duration::from_millis(100), handle.first_exit()).await;
        assert!(early.is_err(), "no loop should exit before stop");

        let stopped = tokio::time::timeout(Duration::from_secs(5), handle.stop()).await;
        assert!(matches!(stopped, Ok(Ok(()))));
        assert_eq!(sink.task_logs().len(), 8);
        assert_eq!(sink.samples().len(), 5);
    }

    #[tokio::test]
    async fn test_fatal_loop_exit_is_reported() {
        let shutdown = Shutdown::new();
        let healthy = tokio::spawn(run_periodic(
            "healthy",
            Duration::from_secs(3600),
            shutdown.signal(),
            || async { Ok(()) },
        ));
        let broken = tokio::spawn(run_periodic(
            "broken",
            Duration::from_millis(5),
            shutdown.signal(),
            || async { Err(CostByteError::LoopFatal("roster corrupted".into())) },
        ));
        let mut handle = RuntimeHandle::new(shutdown, vec![("healthy", healthy), ("broken", broken)]);

        let (name, outcome) = tokio::time::timeout(Duration::from_secs(5), handle.first_exit())
            .await
            .unwrap();
        assert_eq!(name, "broken");
        assert!(matches!(outcome, Err(CostByteError::LoopFatal(_))));

        // The surviving loop still shuts down cleanly.
        assert!(handle.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_panicked_loop_task_is_fatal() {
        let shutdown = Shutdown::new();
        let crashed: JoinHandle<Result<()>> = tokio::spawn(async {
            if true {
                panic!("loop crashed");
            }
            Ok(())
        });
        let mut handle = RuntimeHandle::new(shutdown, vec![("crashed", crashed)]);

        let (name, outcome) = handle.first_exit().await;
        assert_eq!(name, "crashed");
        assert!(matches!(outcome, Err(CostByteError::LoopFatal(_))));
        assert!(handle.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_out_of_range_threshold_rejected() {
        let mut config = CostByteConfig::default();
        config.monitor.staleness_threshold_secs = u64::MAX;
        let result = WorkerRuntime::new(
            &config,
            full_registry(),
            Arc::new(MemorySink::new()),
            Arc::new(ManualClock::new(Utc::now())),
        );
        assert!(matches!(result, Err(CostByteError::Config(_))));
    }
}
