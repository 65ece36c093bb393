//! Capability registry: role → capability lookup table.
//!
//! Adding a role means registering a capability here; the dispatcher never
//! branches on role.

use std::collections::HashMap;
use std::sync::Arc;

use costbyte_core::error::{CostByteError, Result};
use costbyte_core::traits::Capability;
use costbyte_core::types::Role;

/// Registry of capabilities keyed by role.
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<Role, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the capability for a role.
    pub fn register(&mut self, role: Role, capability: Arc<dyn Capability>) {
        tracing::debug!("🧩 Capability '{}' registered for role {}", capability.name(), role);
        self.capabilities.insert(role, capability);
    }

    /// Resolve a role. Fails only when the role has no mapping at all.
    pub fn resolve(&self, role: &Role) -> Result<Arc<dyn Capability>> {
        self.capabilities
            .get(role)
            .cloned()
            .ok_or_else(|| CostByteError::UnknownCapability(role.to_string()))
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.capabilities.contains_key(role)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use costbyte_core::types::{TaskPayload, TaskResult};

    struct Echo;

    #[async_trait]
    impl Capability for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(&self, payload: &TaskPayload) -> Result<TaskResult> {
            Ok(TaskResult::new("echo").with("keys", payload.len()))
        }
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let mut reg = CapabilityRegistry::new();
        reg.register(Role::ContentCreator, Arc::new(Echo));
        assert!(reg.contains(&Role::ContentCreator));

        let cap = reg.resolve(&Role::ContentCreator).unwrap();
        let result = cap.execute(&TaskPayload::new()).await.unwrap();
        assert_eq!(result.task, "echo");
    }

    #[test]
    fn test_unknown_role() {
        let reg = CapabilityRegistry::new();
        let err = reg.resolve(&Role::Other("sommelier".into())).err().unwrap();
        assert!(matches!(err, CostByteError::UnknownCapability(ref r) if r == "sommelier"));
    }

    #[test]
    fn test_register_replaces() {
        let mut reg = CapabilityRegistry::new();
        reg.register(Role::SecurityGuardian, Arc::new(Echo));
        reg.register(Role::SecurityGuardian, Arc::new(Echo));
        reg.register(Role::ContentCreator, Arc::new(Echo));
        assert_eq!(reg.len(), 2);
        assert!(!reg.is_empty());
    }
}
