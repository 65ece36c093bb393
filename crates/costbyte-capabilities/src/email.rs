//! Email marketer: audience/template campaigns.
//!
//! Delivery goes through a [`Mailer`]: SMTP via async lettre when
//! credentials are configured, otherwise a mailer that only logs.

use std::sync::Arc;

use async_trait::async_trait;
use costbyte_core::config::SmtpConfig;
use costbyte_core::error::{CostByteError, Result};
use costbyte_core::traits::Capability;
use costbyte_core::types::{TaskPayload, TaskResult};
use serde_json::{Value, json};

use crate::payload_str;

/// A campaign recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub email: &'static str,
    pub name: &'static str,
}

const fn recipient(email: &'static str, name: &'static str) -> Recipient {
    Recipient { email, name }
}

/// Recipients for an audience. Unknown audiences have none.
pub fn recipients_for(audience: &str) -> Vec<Recipient> {
    match audience {
        "hotels" => vec![
            recipient("hotel1@example.com", "Hotel Manager 1"),
            recipient("hotel2@example.com", "Hotel Manager 2"),
        ],
        "restaurants" => vec![
            recipient("restaurant1@example.com", "Restaurant Owner 1"),
            recipient("restaurant2@example.com", "Restaurant Owner 2"),
        ],
        "catering" => vec![
            recipient("catering1@example.com", "Catering Manager 1"),
            recipient("catering2@example.com", "Catering Manager 2"),
        ],
        "all" => vec![
            recipient("hotel1@example.com", "Hotel Manager 1"),
            recipient("restaurant1@example.com", "Restaurant Owner 1"),
            recipient("catering1@example.com", "Catering Manager 1"),
        ],
        _ => Vec::new(),
    }
}

/// Rendered campaign email.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Render a template for an audience. Unknown templates fall back to `general`.
pub fn render_template(template: &str, audience: &str) -> EmailContent {
    let (subject, html) = match template {
        "welcome" => (
            format!(
                "Welcome to CostByte - Revolutionizing {} Food Cost Management",
                capitalize(audience)
            ),
            format!(
                "<h1>Welcome to CostByte!</h1>\n\
                 <p>Dear {audience} owner,</p>\n\
                 <p>We're excited to help you reduce food costs and improve efficiency.</p>\n\
                 <p>Our AI-powered platform can help you save up to 15% on food costs.</p>\n\
                 <a href=\"https://costbyte.co.za\">Learn more</a>"
            ),
        ),
        "promotion" => (
            format!(
                "Special Offer for {} Businesses - Save 20% on CostByte",
                capitalize(audience)
            ),
            format!(
                "<h1>Special Limited Time Offer!</h1>\n\
                 <p>Dear {audience} owner,</p>\n\
                 <p>For a limited time, save 20% on CostByte subscription.</p>\n\
                 <p>Use code: SAVE20 at checkout.</p>\n\
                 <a href=\"https://costbyte.co.za/pricing\">Get Started</a>"
            ),
        ),
        _ => (
            "Improve Your Food Cost Management with CostByte".to_string(),
            "<h1>Transform Your Kitchen Operations</h1>\n\
             <p>CostByte helps you reduce waste, track costs, and improve efficiency.</p>\n\
             <a href=\"https://costbyte.co.za\">Learn how</a>"
                .to_string(),
        ),
    };
    let text = strip_html(&html);
    EmailContent { subject, html, text }
}

/// Plain-text rendering of simple HTML: tags removed, blank lines dropped.
pub fn strip_html(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> Result<()>;
}

/// SMTP delivery (STARTTLS relay).
pub struct SmtpMailer {
    from: lettre::message::Mailbox,
    transport: lettre::AsyncSmtpTransport<lettre::Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        use lettre::transport::smtp::authentication::Credentials;

        let from: lettre::message::Mailbox = format!("{} <{}>", config.from_name, config.username)
            .parse()
            .map_err(|e| CostByteError::Config(format!("Invalid SMTP sender: {e}")))?;
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport =
            lettre::AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(&config.server)
                .map_err(|e| CostByteError::Config(format!("SMTP relay: {e}")))?
                .port(config.port)
                .credentials(creds)
                .build();
        Ok(Self { from, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> Result<()> {
        use lettre::{AsyncTransport, Message, message::Mailbox, message::MultiPart};

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| CostByteError::Capability(format!("Invalid to: {e}")))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(text.to_string(), html.to_string()))
            .map_err(|e| CostByteError::Capability(format!("Build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| CostByteError::Capability(format!("SMTP send: {e}")))?;
        tracing::info!("📤 Email sent to: {to}");
        Ok(())
    }
}

/// Used when no SMTP credentials are configured. Nothing leaves the process.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str, _text: &str) -> Result<()> {
        tracing::info!("📭 [dry-run] Email to {to}: {subject}");
        Ok(())
    }
}

pub struct EmailMarketer {
    mailer: Arc<dyn Mailer>,
}

impl EmailMarketer {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// SMTP when credentials exist, log-only otherwise.
    pub fn from_config(config: &SmtpConfig) -> Self {
        if !config.has_credentials() {
            tracing::info!("📭 No SMTP credentials, email campaigns will be logged only");
            return Self::new(Arc::new(LogMailer));
        }
        match SmtpMailer::new(config) {
            Ok(mailer) => Self::new(Arc::new(mailer)),
            Err(e) => {
                tracing::warn!("⚠️ SMTP setup failed, falling back to log-only mailer: {e}");
                Self::new(Arc::new(LogMailer))
            }
        }
    }
}

#[async_trait]
impl Capability for EmailMarketer {
    fn name(&self) -> &str {
        "email_marketer"
    }

    async fn execute(&self, payload: &TaskPayload) -> Result<TaskResult> {
        let audience = payload_str(payload, "audience", "all");
        let template = payload_str(payload, "template", "general");

        let recipients = recipients_for(&audience);
        if recipients.is_empty() {
            tracing::warn!("⚠️ No recipients for audience '{audience}'");
        }
        let content = render_template(&template, &audience);

        let mut results: Vec<Value> = Vec::with_capacity(recipients.len());
        let mut sent = 0usize;
        for recipient in &recipients {
            let status = match self
                .mailer
                .send(recipient.email, &content.subject, &content.html, &content.text)
                .await
            {
                Ok(()) => {
                    sent += 1;
                    "success"
                }
                Err(e) => {
                    tracing::warn!("⚠️ Email to {} failed: {e}", recipient.email);
                    "failed"
                }
            };
            results.push(json!({ "recipient": recipient.email, "status": status }));
        }

        tracing::info!("📧 Campaign '{template}' to {audience}: {sent}/{} sent", recipients.len());
        Ok(TaskResult::new("send_campaign")
            .with("campaign", template)
            .with("audience", audience)
            .with("sent_count", sent)
            .with("total_count", recipients.len())
            .with("results", results))
    }
}
