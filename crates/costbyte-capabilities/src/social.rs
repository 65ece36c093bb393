//! Social media manager: posts to LinkedIn, Facebook and Twitter.
//!
//! Platform APIs are not called; posts are simulated and logged, returning a
//! generated post id.

use async_trait::async_trait;
use costbyte_core::config::SocialConfig;
use costbyte_core::error::{CostByteError, Result};
use costbyte_core::traits::Capability;
use costbyte_core::types::{TaskPayload, TaskResult};
use serde_json::{Value, json};

use crate::payload_str;

/// Supported platforms.
pub const PLATFORMS: [&str; 3] = ["linkedin", "facebook", "twitter"];

pub struct SocialMediaManager {
    linkedin_api_key: String,
    facebook_api_key: String,
    twitter_api_key: String,
}

impl SocialMediaManager {
    pub fn new(config: &SocialConfig) -> Self {
        Self {
            linkedin_api_key: config.linkedin_api_key.clone(),
            facebook_api_key: config.facebook_api_key.clone(),
            twitter_api_key: config.twitter_api_key.clone(),
        }
    }

    fn api_key(&self, platform: &str) -> Option<&str> {
        match platform {
            "linkedin" => Some(self.linkedin_api_key.as_str()),
            "facebook" => Some(self.facebook_api_key.as_str()),
            "twitter" => Some(self.twitter_api_key.as_str()),
            _ => None,
        }
    }

    /// Publish `content` on one platform.
    pub async fn post(&self, platform: &str, content: &str) -> Result<TaskResult> {
        let Some(key) = self.api_key(platform) else {
            return Err(CostByteError::Capability(format!("Unknown platform: {platform}")));
        };
        if key.is_empty() {
            tracing::debug!("📣 No {platform} API key configured, simulating post");
        }

        let preview: String = content.chars().take(100).collect();
        tracing::info!("📣 Posted to {platform}: {preview}");

        let post_id = format!("{platform}_{}", uuid::Uuid::new_v4().simple());
        Ok(TaskResult::new(format!("{platform}_post"))
            .with("platform", platform)
            .with("content", content)
            .with("post_id", post_id))
    }

    /// Post a batch in order. One bad post does not stop the rest.
    pub async fn schedule_posts(&self, posts: &[TaskPayload]) -> TaskResult {
        let mut results: Vec<Value> = Vec::with_capacity(posts.len());
        for post in posts {
            let platform = payload_str(post, "platform", "linkedin");
            let content = payload_str(post, "content", "");
            let entry = match self.post(&platform, &content).await {
                Ok(r) => {
                    let mut obj = r.data;
                    obj.insert("status".into(), json!("success"));
                    Value::Object(obj)
                }
                Err(e) => json!({ "status": "error", "platform": platform, "message": e.to_string() }),
            };
            results.push(entry);
        }

        TaskResult::new("schedule_posts")
            .with("scheduled_count", posts.len())
            .with("results", results)
    }
}

#[async_trait]
impl Capability for SocialMediaManager {
    fn name(&self) -> &str {
        "social_media_manager"
    }

    async fn execute(&self, payload: &TaskPayload) -> Result<TaskResult> {
        let platform = payload_str(payload, "platform", "linkedin");
        let content = payload_str(payload, "content", "");
        self.post(&platform, &content).await
    }
}
