use async_trait::async_trait;

use crate::config::SmtpConfig;
use crate::error::AppResult;

/// A fully composed email, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Delivery seam for outgoing email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> AppResult;
}

/// Delivers email over SMTP.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult {
        let message = mail_send::mail_builder::MessageBuilder::new()
            .from((
                self.config.from_name.as_str(),
                self.config.from_address.as_str(),
            ))
            .to(email.to.as_str())
            .subject(email.subject.as_str())
            .text_body(email.text_body.as_str())
            .html_body(email.html_body.as_str());

        mail_send::SmtpClientBuilder::new(self.config.host.as_str(), self.config.port)
            .credentials((self.config.username.as_str(), self.config.password.as_str()))
            .connect()
            .await?
            .send(message)
            .await?;

        tracing::debug!(to = %email.to, "Sent email");

        Ok(())
    }
}

/// Logs and drops outgoing email. Used when no SMTP settings are configured.
pub struct DiscardMailer;

#[async_trait]
impl Mailer for DiscardMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult {
        tracing::warn!(
            to = %email.to,
            subject = %email.subject,
            "SMTP not configured; discarding email"
        );
        Ok(())
    }
}

/// Records outgoing email for assertions.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    sent: parking_lot::Mutex<Vec<OutgoingEmail>>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult {
        self.sent.lock().push(email);
        Ok(())
    }
}
