//! No-op capability for roles with no backend yet.

use async_trait::async_trait;
use costbyte_core::error::Result;
use costbyte_core::traits::Capability;
use costbyte_core::types::{TaskPayload, TaskResult};

/// Always succeeds with `task: "noop"`.
pub struct NoopCapability {
    role: String,
}

impl NoopCapability {
    pub fn new(role: &str) -> Self {
        Self {
            role: role.to_string(),
        }
    }
}

#[async_trait]
impl Capability for NoopCapability {
    fn name(&self) -> &str {
        &self.role
    }

    async fn execute(&self, _payload: &TaskPayload) -> Result<TaskResult> {
        tracing::debug!("💤 {} has nothing to do", self.role);
        Ok(TaskResult::new("noop"))
    }
}
