//! CostByte configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CostByteError, Result};
use crate::types::Role;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostByteConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub social: SocialConfig,
    #[serde(default)]
    pub ml: MlConfig,
    #[serde(default = "default_workers")]
    pub workers: Vec<WorkerConfig>,
}

fn default_project_name() -> String { "CostByte".into() }
fn default_version() -> String { "1.0.0".into() }

impl Default for CostByteConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            version: default_version(),
            scheduler: SchedulerConfig::default(),
            monitor: MonitorConfig::default(),
            telemetry: TelemetryConfig::default(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            smtp: SmtpConfig::default(),
            social: SocialConfig::default(),
            ml: MlConfig::default(),
            workers: default_workers(),
        }
    }
}

impl CostByteConfig {
    /// Load config from the default path (~/.costbyte/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CostByteError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CostByteError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CostByteError::Config(format!("Failed to serialize config: {e}")))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the CostByte home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".costbyte")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the environment, in production).
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = get("SMTP_SERVER") {
            self.smtp.server = v;
        }
        if let Some(v) = get("SMTP_PORT") {
            match v.parse() {
                Ok(port) => self.smtp.port = port,
                Err(_) => tracing::warn!("⚠️ Ignoring invalid SMTP_PORT: {v}"),
            }
        }
        if let Some(v) = get("SMTP_USERNAME") {
            self.smtp.username = v;
        }
        if let Some(v) = get("SMTP_PASSWORD") {
            self.smtp.password = v;
        }
        if let Some(v) = get("LINKEDIN_API_KEY") {
            self.social.linkedin_api_key = v;
        }
        if let Some(v) = get("FACEBOOK_API_KEY") {
            self.social.facebook_api_key = v;
        }
        if let Some(v) = get("TWITTER_API_KEY") {
            self.social.twitter_api_key = v;
        }
        if let Some(v) = get("MONITORING_INTERVAL") {
            // One knob drives both monitoring loops.
            match v.parse::<u64>() {
                Ok(secs) => {
                    self.monitor.interval_secs = secs;
                    self.telemetry.interval_secs = secs;
                }
                Err(_) => tracing::warn!("⚠️ Ignoring invalid MONITORING_INTERVAL: {v}"),
            }
        }
        if let Some(v) = get("DATABASE_URL") {
            match v.strip_prefix("sqlite:///").or_else(|| v.strip_prefix("sqlite://")) {
                Some(path) => self.database.path = path.to_string(),
                None => tracing::warn!("⚠️ Only sqlite DATABASE_URL is supported, ignoring: {v}"),
            }
        }
    }

    /// Reject settings the loops cannot run with.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("scheduler.interval_secs", self.scheduler.interval_secs),
            ("scheduler.task_timeout_secs", self.scheduler.task_timeout_secs),
            ("monitor.interval_secs", self.monitor.interval_secs),
            ("monitor.staleness_threshold_secs", self.monitor.staleness_threshold_secs),
            ("telemetry.interval_secs", self.telemetry.interval_secs),
        ];
        for (key, value) in checks {
            if value == 0 {
                return Err(CostByteError::Config(format!("{key} must be greater than zero")));
            }
        }
        self.monitor.staleness_threshold()?;
        Ok(())
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Sleep between roster passes.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Upper bound on a single capability call.
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
}

fn default_interval() -> u64 { 300 }
fn default_task_timeout() -> u64 { 120 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            task_timeout_secs: default_task_timeout(),
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}

/// Heartbeat monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// A worker silent for longer than this is considered stalled.
    #[serde(default = "default_staleness")]
    pub staleness_threshold_secs: u64,
}

fn default_staleness() -> u64 { 3600 }

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            staleness_threshold_secs: default_staleness(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Threshold as a signed duration. Fails for values chrono cannot represent.
    pub fn staleness_threshold(&self) -> Result<chrono::Duration> {
        i64::try_from(self.staleness_threshold_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                CostByteError::Config(format!(
                    "monitor.staleness_threshold_secs is out of range: {}",
                    self.staleness_threshold_secs
                ))
            })
    }
}

/// Telemetry recorder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_metric_type")]
    pub metric_type: String,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricConfig>,
}

/// A metric the recorder snapshots each cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricConfig {
    pub name: String,
    /// Value reported by the static metric source.
    #[serde(default)]
    pub value: f64,
}

fn default_metric_type() -> String { "performance".into() }
fn default_metrics() -> Vec<MetricConfig> {
    [
        ("response_time", 150.0),
        ("memory_usage", 45.0),
        ("cpu_usage", 25.0),
        ("active_users", 42.0),
        ("request_rate", 120.0),
    ]
    .into_iter()
    .map(|(name, value)| MetricConfig { name: name.into(), value })
    .collect()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            metric_type: default_metric_type(),
            metrics: default_metrics(),
        }
    }
}

impl TelemetryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// SQLite log/metric store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.costbyte/costbyte.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

/// Text-generation backend (OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_llm_endpoint() -> String { "https://api.openai.com/v1".into() }
fn default_llm_model() -> String { "gpt-4".into() }
fn default_max_tokens() -> u32 { 1000 }
fn default_temperature() -> f32 { 0.7 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Outbound mail transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_server")]
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_server() -> String { "smtp.gmail.com".into() }
fn default_smtp_port() -> u16 { 587 }
fn default_from_name() -> String { "CostByte".into() }

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: default_smtp_server(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_name: default_from_name(),
        }
    }
}

impl SmtpConfig {
    /// Whether real delivery is possible.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Social platform API keys.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SocialConfig {
    #[serde(default)]
    pub linkedin_api_key: String,
    #[serde(default)]
    pub facebook_api_key: String,
    #[serde(default)]
    pub twitter_api_key: String,
}

/// Model training output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlConfig {
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
}

fn default_models_dir() -> String { "~/.costbyte/models".into() }

impl Default for MlConfig {
    fn default() -> Self {
        Self { models_dir: default_models_dir() }
    }
}

/// One roster entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfig {
    pub name: String,
    pub role: Role,
    #[serde(default = "default_version")]
    pub version: String,
    /// `false` starts the worker operator-disabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool { true }

impl WorkerConfig {
    pub fn new(name: &str, role: Role) -> Self {
        Self {
            name: name.to_string(),
            role,
            version: default_version(),
            enabled: true,
        }
    }
}

fn default_workers() -> Vec<WorkerConfig> {
    vec![
        WorkerConfig::new("ContentBot", Role::ContentCreator),
        WorkerConfig::new("SocialBot", Role::SocialMediaManager),
        WorkerConfig::new("MailBot", Role::EmailMarketer),
        WorkerConfig::new("ModelBot", Role::ModelTrainer),
        WorkerConfig::new("DataBot", Role::DataAnalyst),
        WorkerConfig::new("PriceBot", Role::CostPredictor),
        WorkerConfig::new("InventoryBot", Role::InventoryManager),
        WorkerConfig::new("SecurityBot", Role::SecurityGuardian),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CostByteConfig::default();
        assert_eq!(config.project_name, "CostByte");
        assert_eq!(config.scheduler.interval_secs, 300);
        assert_eq!(config.monitor.staleness_threshold_secs, 3600);
        assert_eq!(config.telemetry.metrics.len(), 5);
        assert_eq!(config.workers.len(), 8);
        assert_eq!(config.workers[0].name, "ContentBot");
        assert_eq!(config.workers[7].role, Role::SecurityGuardian);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [scheduler]
            interval_secs = 60
            task_timeout_secs = 10

            [monitor]
            staleness_threshold_secs = 900

            [[workers]]
            name = "OnlyBot"
            role = "email_marketer"

            [[workers]]
            name = "OddBot"
            role = "pastry_chef"
            version = "2.1.0"
            enabled = false
        "#;

        let config: CostByteConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scheduler.interval_secs, 60);
        assert_eq!(config.scheduler.task_timeout(), Duration::from_secs(10));
        assert_eq!(config.monitor.interval_secs, 300);
        assert_eq!(
            config.monitor.staleness_threshold().unwrap(),
            chrono::Duration::minutes(15)
        );
        assert_eq!(config.workers.len(), 2);
        assert_eq!(config.workers[0].role, Role::EmailMarketer);
        assert_eq!(config.workers[0].version, "1.0.0");
        assert_eq!(config.workers[1].role, Role::Other("pastry_chef".into()));
        assert!(config.workers[0].enabled);
        assert!(!config.workers[1].enabled);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: CostByteConfig = toml::from_str("").unwrap();
        assert_eq!(config.telemetry.metric_type, "performance");
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.workers.len(), 8);
    }

    #[test]
    fn test_toml_roundtrip_keeps_roster() {
        let config = CostByteConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed: CostByteConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.workers, config.workers);
        assert_eq!(parsed.telemetry.metrics, config.telemetry.metrics);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-test"),
            ("SMTP_PORT", "2525"),
            ("MONITORING_INTERVAL", "60"),
            ("DATABASE_URL", "sqlite:///./costbyte.db"),
            ("TWITTER_API_KEY", "   "),
        ]
        .into_iter()
        .collect();

        let mut config = CostByteConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.monitor.interval_secs, 60);
        assert_eq!(config.telemetry.interval_secs, 60);
        assert_eq!(config.database.path, "./costbyte.db");
        assert!(config.social.twitter_api_key.is_empty());
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = CostByteConfig::default();
        config.apply_overrides_from(|k| match k {
            "SMTP_PORT" => Some("not-a-port".into()),
            "DATABASE_URL" => Some("postgres://db/costbyte".into()),
            _ => None,
        });
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.database.path, "~/.costbyte/costbyte.db");
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = CostByteConfig::default();
        assert!(config.validate().is_ok());
        config.monitor.staleness_threshold_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("staleness_threshold_secs"));
    }

    #[test]
    fn test_validate_rejects_unrepresentable_threshold() {
        let config: CostByteConfig =
            toml::from_str("[monitor]\nstaleness_threshold_secs = 9223372036854775807").unwrap();
        assert!(config.monitor.staleness_threshold().is_err());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("staleness_threshold_secs"));

        let mut config = CostByteConfig::default();
        config.monitor.staleness_threshold_secs = u64::MAX;
        assert!(config.monitor.staleness_threshold().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_upper_bound() {
        let max_secs = (i64::MAX / 1000) as u64;
        let mut config = CostByteConfig::default();
        config.monitor.staleness_threshold_secs = max_secs;
        assert!(config.validate().is_ok());
        assert!(config.monitor.staleness_threshold().unwrap() > chrono::Duration::zero());

        config.monitor.staleness_threshold_secs = max_secs + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_home_dir() {
        let home = CostByteConfig::home_dir();
        assert!(home.to_string_lossy().contains("costbyte"));
    }
}
