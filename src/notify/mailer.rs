//! Mail transport
//!
//! All outgoing mail goes through the `Mailer`, which wraps a
//! `MailTransport`. Production uses SMTP via lettre; tests swap in a
//! recording transport. With `email.enabled = false` the mailer logs the
//! send and returns without touching the transport.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tracing::info;

use crate::config::EmailConfig;

/// Transport seam for outgoing mail
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send one plain-text message to the given recipients
    async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<()>;
}

/// SMTP transport backed by lettre
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    /// Build an SMTP transport from the email configuration
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let from = config
            .from
            .parse()
            .map_err(|e| anyhow!("Invalid from address '{}': {}", config.from, e))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(config.smtp_port);
        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for addr in to {
            builder = builder.to(addr
                .parse()
                .map_err(|e| anyhow!("Invalid recipient '{}': {}", addr, e))?);
        }
        let email = builder
            .body(body.to_string())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;
        Ok(())
    }
}

/// Outgoing mail facade
pub struct Mailer {
    enabled: bool,
    transport: Arc<dyn MailTransport>,
}

impl Mailer {
    /// Build a mailer from the email configuration, using SMTP
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        Ok(Self {
            enabled: config.enabled,
            transport: Arc::new(SmtpMailTransport::from_config(config)?),
        })
    }

    /// Build an always-enabled mailer over a custom transport
    pub fn with_transport(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            enabled: true,
            transport,
        }
    }

    /// Send one plain-text message to the given recipients.
    ///
    /// No-op for an empty recipient list. When mail is disabled the send
    /// is logged and skipped.
    pub async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<()> {
        if to.is_empty() {
            return Ok(());
        }
        if !self.enabled {
            info!(
                recipients = to.len(),
                subject, "Email disabled, skipping send"
            );
            return Ok(());
        }
        self.transport.send(to, subject, body).await
    }

    /// Send the registration welcome email
    pub async fn send_welcome(&self, to: &str, username: &str, site_name: &str) -> Result<()> {
        let subject = format!("Добро пожаловать на {}", site_name);
        let body = format!(
            "Здравствуйте, {}!\n\nСпасибо за регистрацию на {}.",
            username, site_name
        );
        self.send(&[to.to_string()], &subject, &body).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// One message captured by the recording transport
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentMail {
        pub to: Vec<String>,
        pub subject: String,
        pub body: String,
    }

    /// In-memory transport that records every send
    #[derive(Default)]
    pub struct RecordingMailTransport {
        sent: Mutex<Vec<SentMail>>,
    }

    impl RecordingMailTransport {
        pub fn sent(&self) -> Vec<SentMail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailTransport for RecordingMailTransport {
        async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<()> {
            self.sent.lock().unwrap().push(SentMail {
                to: to.to_vec(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_mailer_sends_through_transport() {
        let transport = Arc::new(RecordingMailTransport::default());
        let mailer = Mailer::with_transport(transport.clone());

        mailer
            .send(&["a@example.com".to_string()], "Subject", "Body")
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["a@example.com".to_string()]);
        assert_eq!(sent[0].subject, "Subject");
        assert_eq!(sent[0].body, "Body");
    }

    #[tokio::test]
    async fn test_mailer_skips_empty_recipients() {
        let transport = Arc::new(RecordingMailTransport::default());
        let mailer = Mailer::with_transport(transport.clone());

        mailer.send(&[], "Subject", "Body").await.unwrap();

        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_mailer_does_not_touch_transport() {
        let transport = Arc::new(RecordingMailTransport::default());
        let mailer = Mailer {
            enabled: false,
            transport: transport.clone(),
        };

        mailer
            .send(&["a@example.com".to_string()], "Subject", "Body")
            .await
            .unwrap();

        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_welcome_composition() {
        let transport = Arc::new(RecordingMailTransport::default());
        let mailer = Mailer::with_transport(transport.clone());

        mailer
            .send_welcome("ivan@example.com", "ivan", "Gazette")
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Добро пожаловать на Gazette");
        assert!(sent[0].body.contains("ivan"));
    }

    #[test]
    fn test_smtp_transport_from_config() {
        let config = EmailConfig::default();
        assert!(SmtpMailTransport::from_config(&config).is_ok());

        let bad = EmailConfig {
            from: "not an address".to_string(),
            ..EmailConfig::default()
        };
        assert!(SmtpMailTransport::from_config(&bad).is_err());
    }
}
