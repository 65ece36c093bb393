//! # CostByte Capabilities
//!
//! Concrete collaborators behind each built-in worker role. The scheduler
//! only ever sees them as `Capability` trait objects.
//!
//! | Role | Capability |
//! |------|------------|
//! | content_creator | [`ContentCreator`] (chat completions) |
//! | social_media_manager | [`SocialMediaManager`] (simulated posts) |
//! | email_marketer | [`EmailMarketer`] (SMTP or log-only) |
//! | model_trainer | [`ModelTrainer`] (linear models on synthetic data) |
//! | data_analyst, cost_predictor, inventory_manager, security_guardian | [`NoopCapability`] |

pub mod content;
pub mod email;
pub mod noop;
pub mod social;
pub mod trainer;

use std::sync::Arc;

use costbyte_core::config::CostByteConfig;
use costbyte_core::types::{Role, TaskPayload};
use costbyte_scheduler::CapabilityRegistry;

pub use content::ContentCreator;
pub use email::{EmailMarketer, LogMailer, Mailer, SmtpMailer};
pub use noop::NoopCapability;
pub use social::SocialMediaManager;
pub use trainer::{ModelKind, ModelTrainer};

/// String field from a payload, or `default` when absent or not a string.
pub(crate) fn payload_str(payload: &TaskPayload, key: &str, default: &str) -> String {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

/// Registry with a capability for every built-in role.
pub fn default_registry(config: &CostByteConfig) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();

    registry.register(Role::ContentCreator, Arc::new(ContentCreator::new(&config.llm)));
    registry.register(
        Role::SocialMediaManager,
        Arc::new(SocialMediaManager::new(&config.social)),
    );
    registry.register(Role::EmailMarketer, Arc::new(EmailMarketer::from_config(&config.smtp)));

    let models_dir = shellexpand::tilde(&config.ml.models_dir).to_string();
    registry.register(Role::ModelTrainer, Arc::new(ModelTrainer::new(models_dir)));

    for role in [
        Role::DataAnalyst,
        Role::CostPredictor,
        Role::InventoryManager,
        Role::SecurityGuardian,
    ] {
        let noop = NoopCapability::new(role.as_str());
        registry.register(role, Arc::new(noop));
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_builtin_role_is_registered() {
        let registry = default_registry(&CostByteConfig::default());
        for role in Role::BUILTIN {
            assert!(registry.contains(&role), "missing capability for {role}");
        }
        assert_eq!(registry.len(), 8);
        assert!(registry.resolve(&Role::Other("pastry_chef".into())).is_err());
    }

    #[tokio::test]
    async fn test_noop_roles_succeed() {
        let registry = default_registry(&CostByteConfig::default());
        let cap = registry.resolve(&Role::SecurityGuardian).unwrap();
        assert_eq!(cap.execute(&TaskPayload::new()).await.unwrap().task, "noop");
    }

    #[test]
    fn test_payload_str() {
        let mut payload = TaskPayload::new();
        payload.insert("topic".into(), json!("waste"));
        payload.insert("count".into(), json!(3));
        assert_eq!(payload_str(&payload, "topic", "x"), "waste");
        assert_eq!(payload_str(&payload, "count", "x"), "x");
        assert_eq!(payload_str(&payload, "missing", "x"), "x");
    }
}
