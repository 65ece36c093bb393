//! Content creator: writes hospitality marketing copy through an
//! OpenAI-compatible chat completions endpoint.

use async_trait::async_trait;
use costbyte_core::config::LlmConfig;
use costbyte_core::error::{CostByteError, Result};
use costbyte_core::traits::Capability;
use costbyte_core::types::{TaskPayload, TaskResult};
use serde_json::{Value, json};

use crate::payload_str;

const SYSTEM_PROMPT: &str =
    "You are a content creator specializing in food cost management for restaurants and hotels.";

/// Prompt for a content type. Unknown types get a generic prompt.
pub fn prompt_for(content_type: &str, topic: &str) -> String {
    match content_type {
        "blog_post" => format!(
            "Write a comprehensive blog post about {topic} for restaurant and hotel owners. \
             Include practical tips and strategies."
        ),
        "social_media" => format!(
            "Create engaging social media content about {topic} for the hospitality industry. \
             Make it catchy and informative."
        ),
        "email_newsletter" => format!(
            "Write an email newsletter about {topic} for restaurant and hotel managers. \
             Focus on actionable insights."
        ),
        "ad_copy" => format!(
            "Create compelling ad copy for {topic} targeting hospitality businesses. \
             Highlight benefits and ROI."
        ),
        _ => format!("Write about {topic} for the hospitality industry."),
    }
}

pub struct ContentCreator {
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl ContentCreator {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client: reqwest::Client::new(),
        }
    }

    /// Send one system + user exchange and return the assistant text.
    async fn complete(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(CostByteError::Capability("OpenAI API key not configured".into()));
        }

        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CostByteError::Http(format!("chat completions ({url}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CostByteError::Http(format!("chat completions returned {status}: {text}")));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| CostByteError::Http(format!("invalid completion response: {e}")))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| CostByteError::Capability("completion response had no content".into()))
    }
}

#[async_trait]
impl Capability for ContentCreator {
    fn name(&self) -> &str {
        "content_creator"
    }

    async fn execute(&self, payload: &TaskPayload) -> Result<TaskResult> {
        let content_type = payload_str(payload, "content_type", "blog_post");
        let topic = payload_str(payload, "topic", "food cost management");

        let content = self.complete(&prompt_for(&content_type, &topic)).await?;
        let word_count = content.split_whitespace().count();
        tracing::info!("✍️ Created {content_type} about {topic} ({word_count} words)");

        Ok(TaskResult::new(content_type.clone())
            .with("content_type", content_type)
            .with("topic", topic)
            .with("content", content)
            .with("word_count", word_count))
    }
}
