//! Outgoing email.
//!
//! Handlers only see the [`Mailer`] trait. Production uses SMTP, a server
//! without `MAIL_SERVER` logs emails instead of sending them, and tests
//! capture them in memory.

pub mod templates;

use crate::config::{Config, SmtpSettings};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address {address}: {message}")]
    Address { address: String, message: String },
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("SMTP error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync + fmt::Debug {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Picks the SMTP mailer when a server is configured, the log mailer otherwise.
pub fn mailer_from_config(config: &Config) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.smtp {
        Some(settings) => Ok(Arc::new(SmtpMailer::new(settings)?)),
        None => Ok(Arc::new(LogMailer)),
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        message: e.to_string(),
    })
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpMailer").field("from", &self.from).finish()
    }
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.server)
        };
        let builder = builder.port(settings.port);
        let builder = match (&settings.username, &settings.password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        let from = settings
            .username
            .as_deref()
            .unwrap_or("famiglia-recipes@localhost");

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox(from)?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&email.to)?)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Logs emails instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "mail server not configured, email not sent"
        );
        tracing::debug!(html = %email.html, "email body");
        Ok(())
    }
}

/// Keeps every email in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Most recent email sent to `to`.
    pub fn last_to(&self, to: &str) -> Option<Email> {
        self.sent().into_iter().rev().find(|e| e.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_mailer_captures() {
        let mailer = MemoryMailer::new();
        mailer
            .send(Email {
                to: "a@example.com".into(),
                subject: "one".into(),
                html: "<p>1</p>".into(),
            })
            .await
            .unwrap();
        mailer
            .send(Email {
                to: "a@example.com".into(),
                subject: "two".into(),
                html: "<p>2</p>".into(),
            })
            .await
            .unwrap();

        assert_eq!(mailer.sent().len(), 2);
        assert_eq!(mailer.last_to("a@example.com").unwrap().subject, "two");
        assert!(mailer.last_to("b@example.com").is_none());
    }

    #[test]
    fn test_parse_mailbox_rejects_garbage() {
        assert!(parse_mailbox("not an address").is_err());
        assert!(parse_mailbox("chef@example.com").is_ok());
    }
}
