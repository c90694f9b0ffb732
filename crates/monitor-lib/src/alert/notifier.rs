//! Alert delivery channels
//!
//! Each transport receives its destination explicitly at construction; none
//! of them read process environment.

use crate::config::{ChatConfig, EmailConfig, NotificationConfig};
use crate::error::{MonitorError, Result, TransportError};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Notification channel kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertChannel {
    Email,
    Chat,
}

impl AlertChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertChannel::Email => "email",
            AlertChannel::Chat => "chat",
        }
    }
}

impl fmt::Display for AlertChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers a text message to one destination
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), TransportError>;

    fn channel(&self) -> AlertChannel;
}

/// SMTP delivery with STARTTLS
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, subject: &str, body: &str) -> Result<Message, TransportError> {
        let from = self
            .config
            .sender
            .parse::<Mailbox>()
            .map_err(|e| TransportError::new("email", format!("invalid sender: {}", e)))?;
        let to = self
            .config
            .recipient
            .parse::<Mailbox>()
            .map_err(|e| TransportError::new("email", format!("invalid recipient: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| TransportError::new("email", e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), TransportError> {
        let message = self.build_message(subject, body)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            .map_err(|e| TransportError::new("email", e.to_string()))?
            .port(self.config.port);
        if let Some(ref password) = self.config.password {
            builder = builder.credentials(Credentials::new(
                self.config.sender.clone(),
                password.clone(),
            ));
        }

        builder
            .build()
            .send(message)
            .await
            .map_err(|e| TransportError::new("email", e.to_string()))?;

        debug!(recipient = %self.config.recipient, "Email alert delivered");
        Ok(())
    }

    fn channel(&self) -> AlertChannel {
        AlertChannel::Email
    }
}

/// Webhook delivery posting `{"text": message}`
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| MonitorError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: config.webhook_url.clone(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, _subject: &str, body: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "text": body }))
            .send()
            .await
            .map_err(|e| TransportError::new("chat", e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(TransportError::new(
                "chat",
                format!("webhook returned {}", response.status()),
            ));
        }

        debug!("Chat alert delivered");
        Ok(())
    }

    fn channel(&self) -> AlertChannel {
        AlertChannel::Chat
    }
}

/// Configured destinations; an absent channel is skipped silently
#[derive(Clone, Default)]
pub struct AlertChannels {
    pub email: Option<Arc<dyn Notifier>>,
    pub chat: Option<Arc<dyn Notifier>>,
}

impl AlertChannels {
    pub fn from_config(config: &NotificationConfig) -> Result<Self> {
        let email = config
            .email
            .clone()
            .map(|c| Arc::new(EmailNotifier::new(c)) as Arc<dyn Notifier>);
        let chat = match config.chat {
            Some(ref c) => Some(Arc::new(WebhookNotifier::new(c)?) as Arc<dyn Notifier>),
            None => None,
        };
        Ok(Self { email, chat })
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.chat.is_none()
    }
}

impl fmt::Debug for AlertChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertChannels")
            .field("email", &self.email.is_some())
            .field("chat", &self.chat.is_some())
            .finish()
    }
}
