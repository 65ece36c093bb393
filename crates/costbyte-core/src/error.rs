//! Error types for CostByte.

use std::time::Duration;

use thiserror::Error;

/// Every failure the worker runtime can observe.
///
/// Per-worker and per-metric errors (`Capability`, `UnknownCapability`,
/// `Timeout`, `SinkWrite`) are recorded and swallowed by the loops.
/// Only `LoopFatal` is allowed to stop a loop.
#[derive(Debug, Error)]
pub enum CostByteError {
    #[error("Capability failure: {0}")]
    Capability(String),

    #[error("No capability registered for role '{0}'")]
    UnknownCapability(String),

    #[error("Task timed out after {0:?}")]
    Timeout(Duration),

    #[error("Sink write failed: {0}")]
    SinkWrite(String),

    #[error("Fatal loop error: {0}")]
    LoopFatal(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CostByteError {
    /// Whether this error must terminate the loop that observed it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CostByteError::LoopFatal(_))
    }

    /// Short status tag used in task logs.
    pub fn status_tag(&self) -> &'static str {
        match self {
            CostByteError::Timeout(_) => "timeout",
            _ => "error",
        }
    }
}

pub type Result<T> = std::result::Result<T, CostByteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_loop_fatal_is_fatal() {
        assert!(CostByteError::LoopFatal("roster".into()).is_fatal());
        assert!(!CostByteError::Capability("boom".into()).is_fatal());
        assert!(!CostByteError::Timeout(Duration::from_secs(5)).is_fatal());
        assert!(!CostByteError::SinkWrite("disk full".into()).is_fatal());
    }

    #[test]
    fn test_status_tag() {
        assert_eq!(CostByteError::Timeout(Duration::from_secs(30)).status_tag(), "timeout");
        assert_eq!(CostByteError::UnknownCapability("x".into()).status_tag(), "error");
    }

    #[test]
    fn test_display() {
        let e = CostByteError::UnknownCapability("data_analyst".into());
        assert_eq!(e.to_string(), "No capability registered for role 'data_analyst'");
    }
}
