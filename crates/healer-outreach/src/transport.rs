//! Mail delivery seam.

use crate::error::{OutreachError, Result};
use async_trait::async_trait;
use healer_core::{ConfigError, HealerError, OutreachConfig};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::collections::HashSet;
use std::sync::Mutex;

/// One rendered message ready to go out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
    /// Plain-text body
    pub text: String,
    /// Template the message was rendered from
    pub campaign_type: String,
}

/// What the relay reported for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    /// Provider message id, when known
    pub message_id: Option<String>,
}

/// Delivers outreach mail.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Hand one message to the relay.
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt>;

    /// Check the relay is reachable and accepts our credentials.
    async fn verify(&self) -> Result<()> {
        Ok(())
    }
}

/// SMTP delivery over STARTTLS.
pub struct SmtpTransport {
    relay: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("host", &self.host)
            .field("from", &self.from.email.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpTransport {
    /// Build from the `[outreach]` config. Credentials must be present.
    pub fn new(config: &OutreachConfig) -> Result<Self> {
        let smtp = &config.smtp;
        let (Some(user), Some(pass)) = (smtp.username.clone(), smtp.password.clone()) else {
            return Err(HealerError::Config(ConfigError::MissingCredentials).into());
        };
        if !smtp.has_credentials() {
            return Err(HealerError::Config(ConfigError::MissingCredentials).into());
        }

        let sender = config.sender_address().unwrap_or(user.as_str());
        let address: Address = sender
            .parse()
            .map_err(|e| OutreachError::Address(format!("{sender}: {e}")))?;
        let from = Mailbox::new(Some(config.from_name.clone()), address);

        let relay = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| OutreachError::Transport(format!("SMTP relay {}: {e}", smtp.host)))?
            .port(smtp.port)
            .credentials(Credentials::new(user, pass))
            .build();

        Ok(Self {
            relay,
            from,
            host: smtp.host.clone(),
        })
    }

    fn message_id(&self) -> String {
        format!("<{}@{}>", uuid::Uuid::new_v4(), self.from.email.domain())
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| OutreachError::Address(format!("{}: {e}", email.to)))?;
        let message_id = self.message_id();

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .message_id(Some(message_id.clone()))
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| OutreachError::Transport(format!("failed to build message: {e}")))?;

        self.relay
            .send(message)
            .await
            .map_err(|e| OutreachError::Transport(format!("SMTP send failed: {e}")))?;

        tracing::debug!(to = %email.to, message_id = %message_id, "message accepted by relay");
        Ok(SendReceipt {
            message_id: Some(message_id),
        })
    }

    async fn verify(&self) -> Result<()> {
        let ok = self
            .relay
            .test_connection()
            .await
            .map_err(|e| OutreachError::Transport(format!("SMTP verify failed: {e}")))?;
        if ok {
            tracing::info!(host = %self.host, "mail transport verified");
            Ok(())
        } else {
            Err(OutreachError::Transport(format!(
                "SMTP relay {} did not accept the connection",
                self.host
            )))
        }
    }
}

/// Keeps messages in memory instead of sending them. Used for dry runs and
/// tests.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingEmail>>,
    rejected: HashSet<String>,
}

impl RecordingTransport {
    /// A transport that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject messages to `address`, as a relay would for a bad mailbox.
    #[must_use]
    pub fn rejecting(mut self, address: impl Into<String>) -> Self {
        self.rejected.insert(address.into());
        self
    }

    /// Messages accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt> {
        if self.rejected.contains(&email.to) {
            return Err(OutreachError::Transport(format!(
                "550 mailbox unavailable: {}",
                email.to
            )));
        }
        let mut sent = match self.sent.lock() {
            Ok(sent) => sent,
            Err(poisoned) => poisoned.into_inner(),
        };
        sent.push(email.clone());
        Ok(SendReceipt {
            message_id: Some(format!("<recorded-{}@localhost>", sent.len())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hello</p>".to_string(),
            text: "Hello".to_string(),
            campaign_type: "initial_outreach".to_string(),
        }
    }

    #[tokio::test]
    async fn test_recording_transport() {
        let transport = RecordingTransport::new().rejecting("bounce@lunahealing.com");

        let receipt = transport
            .send(&email("luna@lunahealing.com"))
            .await
            .expect("accepted");
        assert_eq!(receipt.message_id.as_deref(), Some("<recorded-1@localhost>"));

        let err = transport
            .send(&email("bounce@lunahealing.com"))
            .await
            .expect_err("rejected");
        assert!(matches!(err, OutreachError::Transport(_)));
        assert_eq!(transport.sent().len(), 1);
        transport.verify().await.expect("verify is a no-op");
    }

    #[test]
    fn test_smtp_requires_credentials() {
        let config = OutreachConfig::default();
        let err = SmtpTransport::new(&config).expect_err("no credentials");
        assert!(matches!(
            err,
            OutreachError::Core(HealerError::Config(ConfigError::MissingCredentials))
        ));
    }

    #[tokio::test]
    async fn test_smtp_builds_with_credentials() {
        let mut config = OutreachConfig::default();
        config.smtp.username = Some("team@thecommonsoul.com".to_string());
        config.smtp.password = Some("app-password".to_string());
        let transport = SmtpTransport::new(&config).expect("transport builds");
        assert_eq!(transport.from.email.to_string(), "team@thecommonsoul.com");
        assert!(transport.message_id().ends_with("@thecommonsoul.com>"));

        config.from_address = Some("not an address".to_string());
        assert!(matches!(
            SmtpTransport::new(&config),
            Err(OutreachError::Address(_))
        ));
    }
}
