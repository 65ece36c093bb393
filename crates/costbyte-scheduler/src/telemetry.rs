//! Telemetry recorder: snapshots the configured metrics every cycle.
//!
//! One sample per metric per cycle, `period_start == period_end == now`.
//! A failed read or write only loses that one metric for that one cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use costbyte_core::config::MetricConfig;
use costbyte_core::error::{CostByteError, Result};
use costbyte_core::traits::{Clock, LogSink, MetricSource};
use costbyte_core::types::MetricSample;

use crate::ticker::{self, ShutdownSignal};

/// Metric source backed by fixed values from the `[telemetry]` table.
pub struct StaticMetricSource {
    values: HashMap<String, f64>,
}

impl StaticMetricSource {
    pub fn new(metrics: &[MetricConfig]) -> Self {
        Self {
            values: metrics.iter().map(|m| (m.name.clone(), m.value)).collect(),
        }
    }
}

#[async_trait]
impl MetricSource for StaticMetricSource {
    async fn sample(&self, metric: &str) -> Result<f64> {
        self.values
            .get(metric)
            .copied()
            .ok_or_else(|| CostByteError::Config(format!("no value configured for metric '{metric}'")))
    }
}

/// Render an interval as a short period label: `5min`, `1h`, `45s`.
pub fn period_label(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs > 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs > 0 && secs % 60 == 0 {
        format!("{}min", secs / 60)
    } else {
        format!("{secs}s")
    }
}

/// Result of one recorder cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryReport {
    pub written: usize,
    pub failed: usize,
    pub sink_healthy: bool,
}

pub struct TelemetryRecorder {
    metrics: Vec<String>,
    metric_type: String,
    period: String,
    source: Arc<dyn MetricSource>,
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
}

impl TelemetryRecorder {
    pub fn new(
        metrics: Vec<String>,
        metric_type: &str,
        interval: Duration,
        source: Arc<dyn MetricSource>,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            metrics,
            metric_type: metric_type.to_string(),
            period: period_label(interval),
            source,
            sink,
            clock,
        }
    }

    pub fn period(&self) -> &str {
        &self.period
    }

    pub async fn run_cycle(&self) -> TelemetryReport {
        let mut report = TelemetryReport::default();

        match self.sink.health_check().await {
            Ok(()) => {
                report.sink_healthy = true;
                tracing::debug!("🩺 System health: database healthy");
            }
            Err(e) => tracing::warn!("🩺 System health: database degraded ({e})"),
        }

        let now = self.clock.now();
        for name in &self.metrics {
            let value = match self.source.sample(name).await {
                Ok(v) if v.is_finite() => v,
                Ok(v) => {
                    tracing::warn!("⚠️ Metric {name} produced non-finite value {v}, skipped");
                    report.failed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to read metric {name}: {e}");
                    report.failed += 1;
                    continue;
                }
            };
            let value = if value < 0.0 {
                tracing::warn!("⚠️ Metric {name} was negative ({value}), recorded as 0");
                0.0
            } else {
                value
            };

            let sample = MetricSample {
                metric_name: name.clone(),
                metric_value: value,
                metric_type: self.metric_type.clone(),
                period: self.period.clone(),
                period_start: now,
                period_end: now,
            };
            match self.sink.write_metric_sample(&sample).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    tracing::error!("❌ Failed to record metric {name}: {e}");
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(
            "📊 Telemetry cycle: {} written, {} failed",
            report.written,
            report.failed
        );
        report
    }

    pub async fn run(&self, interval: Duration, shutdown: ShutdownSignal) -> Result<()> {
        ticker::run_periodic("telemetry", interval, shutdown, || async {
            self.run_cycle().await;
            Ok(())
        })
        .await
    }
}
