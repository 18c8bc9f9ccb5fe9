use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

use crate::config::{MailConfig, MailTransport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail relay URL not configured")]
    NotConfigured,

    #[error("Mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mail relay rejected message with status {0}")]
    Rejected(StatusCode),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Development transport: writes the message to the log
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        tracing::info!(to = %message.to, subject = %message.subject, "email (log transport)\n{}", message.body);
        Ok(())
    }
}

/// POSTs `{from, to, subject, text}` to an HTTP mail relay
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
    from: String,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Upper bound on one relay round trip. Delivery is awaited inline by
/// request handlers, so a stalled relay must not hold them open.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

impl HttpMailer {
    pub fn new(relay_url: impl Into<String>, from: impl Into<String>) -> Self {
        Self::with_timeout(relay_url, from, RELAY_TIMEOUT)
    }

    pub fn with_timeout(relay_url: impl Into<String>, from: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            relay_url: relay_url.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let payload = RelayPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let response = self.client.post(&self.relay_url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status()));
        }
        Ok(())
    }
}

/// Keeps every message in memory for tests
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<EmailMessage>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.lock().map(|outbox| outbox.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(message);
        }
        Ok(())
    }
}

pub fn mailer_from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.transport {
        MailTransport::Log => Ok(Arc::new(LogMailer)),
        MailTransport::Http => {
            let relay_url = config.relay_url.clone().ok_or(MailError::NotConfigured)?;
            Ok(Arc::new(HttpMailer::new(relay_url, config.from_address.clone())))
        }
    }
}

/// Send and swallow failures: a lost email never fails the request.
pub async fn deliver(mailer: &dyn Mailer, message: EmailMessage) {
    let to = message.to.clone();
    if let Err(e) = mailer.send(message).await {
        tracing::warn!("Failed to send email to {}: {}", to, e);
    }
}

pub mod templates {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::EmailMessage;
    use crate::types::OtpPurpose;

    pub fn otp(to: &str, code: &str, purpose: OtpPurpose, ttl_minutes: i64) -> EmailMessage {
        let (subject, action) = match purpose {
            OtpPurpose::VerifyEmail => ("Verify your email address", "verify your email address"),
            OtpPurpose::ResetPassword => ("Reset your password", "reset your password"),
        };
        EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: format!(
                "Use the code {} to {}.\nThe code expires in {} minutes.\n\nIf you did not request this, you can ignore this email.",
                code, action, ttl_minutes
            ),
        }
    }

    pub fn application_approved(to: &str, name: &str, app_url: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Your seller application was approved".to_string(),
            body: format!(
                "Hi {},\n\nYour seller account is ready. Sign in at {}/seller with the email and password you applied with.",
                name,
                app_url.trim_end_matches('/')
            ),
        }
    }

    pub fn application_rejected(to: &str, name: &str, reason: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Your seller application".to_string(),
            body: format!(
                "Hi {},\n\nUnfortunately we could not approve your seller application.\nReason: {}",
                name, reason
            ),
        }
    }

    pub fn feedback_response(to: &str, name: &str, subject: &str, response: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: format!("Re: {}", subject),
            body: format!("Hi {},\n\n{}\n\nThank you for your feedback.", name, response),
        }
    }

    pub fn order_confirmation(to: &str, name: &str, order_id: Uuid, total: Decimal) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: format!("Order {} confirmed", order_id),
            body: format!(
                "Hi {},\n\nWe received your order {}.\nTotal: {}\n\nWe will email you again when it ships.",
                name, order_id, total
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OtpPurpose;

    #[tokio::test]
    async fn stalled_relay_times_out() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mailer = HttpMailer::with_timeout(
            format!("http://{}/send", addr),
            "shop@example.com",
            Duration::from_millis(200),
        );
        let message = templates::otp("a@b.co", "123456", OtpPurpose::VerifyEmail, 10);

        let result = tokio::time::timeout(Duration::from_secs(5), mailer.send(message.clone()))
            .await
            .expect("relay request should give up on its own");
        assert!(matches!(result, Err(MailError::Transport(_))));

        tokio::time::timeout(Duration::from_secs(5), deliver(&mailer, message))
            .await
            .expect("deliver should not hang");
    }

    #[tokio::test]
    async fn memory_mailer_collects_messages() {
        let mailer = MemoryMailer::new();
        deliver(&mailer, templates::otp("a@b.co", "123456", OtpPurpose::VerifyEmail, 10)).await;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@b.co");
        assert!(sent[0].body.contains("123456"));
        assert!(sent[0].body.contains("10 minutes"));
    }

    #[test]
    fn http_transport_requires_relay() {
        let config = MailConfig {
            transport: MailTransport::Http,
            relay_url: None,
            from_address: "no-reply@example.com".to_string(),
            app_url: "http://localhost".to_string(),
        };
        assert!(matches!(mailer_from_config(&config), Err(MailError::NotConfigured)));
    }

    #[test]
    fn approval_link_has_single_slash() {
        let msg = templates::application_approved("s@b.co", "Sam", "https://shop.example.com/");
        assert!(msg.body.contains("https://shop.example.com/seller"));
    }
}
