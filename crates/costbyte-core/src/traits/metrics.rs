//! Metric source: where the telemetry recorder reads values from.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Current value of the named metric.
    async fn sample(&self, metric: &str) -> Result<f64>;
}
