//! Capability trait: the unit of work a worker's role resolves to.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{TaskPayload, TaskResult};

/// An external operation performed on behalf of a worker.
///
/// An empty payload means "use your own defaults", never an error.
/// Implementations may take arbitrarily long; the dispatcher bounds the call.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Capability name, used in logs.
    fn name(&self) -> &str;

    /// Run the task. `Err` is reported as a capability failure.
    async fn execute(&self, payload: &TaskPayload) -> Result<TaskResult>;
}
