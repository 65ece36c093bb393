//! Task builder: the default payload each role runs with on a scheduled cycle.
//!
//! Pure and deterministic: same role, same payload.

use costbyte_core::types::{Role, TaskPayload};
use serde_json::{Value, json};

/// Build the payload for the next scheduled run of `role`.
/// Roles without defaults get an empty payload.
pub fn build_payload(role: &Role) -> TaskPayload {
    let value = match role {
        Role::ContentCreator => json!({
            "content_type": "blog_post",
            "topic": "food cost management",
        }),
        Role::SocialMediaManager => json!({
            "platform": "linkedin",
            "content": "Latest insights on restaurant cost savings",
        }),
        Role::EmailMarketer => json!({
            "audience": "hotels",
            "template": "welcome",
        }),
        _ => return TaskPayload::new(),
    };

    match value {
        Value::Object(map) => map,
        _ => TaskPayload::new(),
    }
}

/// Label used in task logs when a run produced no result of its own.
pub fn task_label(role: &Role) -> &str {
    match role {
        Role::ContentCreator => "create_content",
        Role::SocialMediaManager => "post_content",
        Role::EmailMarketer => "send_campaign",
        Role::ModelTrainer => "train_model",
        other => other.as_str(),
    }
}
