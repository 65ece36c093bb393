//! Shared data types: roles, task payloads, outcomes, log entries, samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CostByteError;

/// Role-specific task input. Free-form key/value pairs.
pub type TaskPayload = Map<String, Value>;

/// Capability tag a worker is created with.
///
/// The set is open: roles outside the built-in list are carried as
/// [`Role::Other`] and resolve to whatever the registry has for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    ContentCreator,
    SocialMediaManager,
    EmailMarketer,
    ModelTrainer,
    DataAnalyst,
    CostPredictor,
    InventoryManager,
    SecurityGuardian,
    Other(String),
}

impl Role {
    /// All built-in roles, in roster order.
    pub const BUILTIN: [Role; 8] = [
        Role::ContentCreator,
        Role::SocialMediaManager,
        Role::EmailMarketer,
        Role::ModelTrainer,
        Role::DataAnalyst,
        Role::CostPredictor,
        Role::InventoryManager,
        Role::SecurityGuardian,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Role::ContentCreator => "content_creator",
            Role::SocialMediaManager => "social_media_manager",
            Role::EmailMarketer => "email_marketer",
            Role::ModelTrainer => "model_trainer",
            Role::DataAnalyst => "data_analyst",
            Role::CostPredictor => "cost_predictor",
            Role::InventoryManager => "inventory_manager",
            Role::SecurityGuardian => "security_guardian",
            Role::Other(name) => name.as_str(),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "content_creator" => Role::ContentCreator,
            "social_media_manager" => Role::SocialMediaManager,
            "email_marketer" => Role::EmailMarketer,
            "model_trainer" => Role::ModelTrainer,
            "data_analyst" => Role::DataAnalyst,
            "cost_predictor" => Role::CostPredictor,
            "inventory_manager" => Role::InventoryManager,
            "security_guardian" => Role::SecurityGuardian,
            _ => Role::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::from(s.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful capability result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Short label of what was done ("blog_post", "linkedin_post", ...).
    pub task: String,
    /// Capability-specific fields, passed through to logs untouched.
    pub data: Map<String, Value>,
}

impl TaskResult {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            data: Map::new(),
        }
    }

    /// Builder-style field insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// What one execution attempt produced.
#[derive(Debug)]
pub enum TaskOutcome {
    Success(TaskResult),
    Failed(CostByteError),
}

impl TaskOutcome {
    /// `success`, `error` or `timeout`.
    pub fn status(&self) -> &'static str {
        match self {
            TaskOutcome::Success(_) => "success",
            TaskOutcome::Failed(e) => e.status_tag(),
        }
    }

    /// `{status: "success", task, ...}` or `{status: "error", message}`.
    pub fn to_json(&self) -> Value {
        match self {
            TaskOutcome::Success(result) => {
                let mut obj = result.data.clone();
                obj.insert("status".into(), Value::from("success"));
                obj.insert("task".into(), Value::from(result.task.clone()));
                Value::Object(obj)
            }
            TaskOutcome::Failed(e) => serde_json::json!({
                "status": "error",
                "message": e.to_string(),
            }),
        }
    }
}

/// One row in the worker log store (task runs and recoveries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerLogEntry {
    /// Worker name, unique within a roster.
    pub worker: String,
    pub task: String,
    pub status: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl WorkerLogEntry {
    pub const HEALTH_CHECK: &'static str = "health_check";
    pub const RESTARTED: &'static str = "restarted";

    /// Recovery record written by the heartbeat monitor.
    pub fn recovery(worker: &str, details: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            worker: worker.to_string(),
            task: Self::HEALTH_CHECK.to_string(),
            status: Self::RESTARTED.to_string(),
            details: details.into(),
            created_at: at,
        }
    }

    pub fn is_recovery(&self) -> bool {
        self.task == Self::HEALTH_CHECK && self.status == Self::RESTARTED
    }
}

/// One telemetry data point. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub metric_name: String,
    pub metric_value: f64,
    pub metric_type: String,
    pub period: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip_names() {
        for role in Role::BUILTIN {
            assert_eq!(Role::from(role.as_str()), role);
        }
        assert_eq!(Role::from("Content_Creator"), Role::ContentCreator);
    }

    #[test]
    fn test_unknown_role_is_kept() {
        let role = Role::from("pastry_chef");
        assert_eq!(role, Role::Other("pastry_chef".into()));
        assert_eq!(role.to_string(), "pastry_chef");
    }

    #[test]
    fn test_role_serde_as_string() {
        let json = serde_json::to_string(&Role::EmailMarketer).unwrap();
        assert_eq!(json, "\"email_marketer\"");
        let role: Role = serde_json::from_str("\"model_trainer\"").unwrap();
        assert_eq!(role, Role::ModelTrainer);
    }

    #[test]
    fn test_outcome_json_shape() {
        let ok = TaskOutcome::Success(TaskResult::new("blog_post").with("word_count", 812));
        let v = ok.to_json();
        assert_eq!(v["status"], "success");
        assert_eq!(v["task"], "blog_post");
        assert_eq!(v["word_count"], 812);

        let err = TaskOutcome::Failed(CostByteError::Capability("upstream down".into()));
        let v = err.to_json();
        assert_eq!(v["status"], "error");
        assert!(v["message"].as_str().unwrap().contains("upstream down"));
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(TaskOutcome::Failed(CostByteError::Timeout(std::time::Duration::from_secs(3))).status(), "timeout");
        assert_eq!(TaskOutcome::Failed(CostByteError::Capability("x".into())).status(), "error");
        assert_eq!(TaskOutcome::Success(TaskResult::new("noop")).status(), "success");
    }

    #[test]
    fn test_recovery_entry() {
        let entry = WorkerLogEntry::recovery("ContentBot", "revived", Utc::now());
        assert!(entry.is_recovery());
        assert_eq!(entry.task, "health_check");
        assert_eq!(entry.status, "restarted");
    }
}
