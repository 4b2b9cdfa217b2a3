//! Outbound email for the contact form.

use std::sync::Mutex;

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

pub const CONTACT_SUBJECT: &str = "New Form Submission";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("smtp error: {0}")]
    Transport(String),
}

/// What a visitor submits through the contact page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl ContactMessage {
    pub fn body(&self) -> String {
        format!(
            "Name: {}\nEmail: {}\nSubject: {}\nMessage: {}",
            self.name, self.email, self.subject, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    /// Visitor address; replies go here.
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    pub fn contact_form(recipient: &str, message: &ContactMessage) -> Self {
        let reply_to = message.email.trim();
        Self {
            to: recipient.to_string(),
            reply_to: (!reply_to.is_empty()).then(|| reply_to.to_string()),
            subject: CONTACT_SUBJECT.to_string(),
            body: message.body(),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// SMTP relay with STARTTLS and login credentials.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(server: &str, port: u16, username: &str, password: &str) -> Result<Self, MailError> {
        let from = mailbox(username)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, email), fields(to = %email.to, subject = %email.subject), err)]
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(mailbox(&email.to)?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN);
        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(mailbox(reply_to)?);
        }
        let message = builder
            .body(email.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        info!("contact email sent");
        Ok(())
    }
}

/// Logs messages instead of sending them and keeps a copy of each.
#[derive(Debug, Default)]
pub struct LogMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "mail delivery disabled; message logged only");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email);
        }
        Ok(())
    }
}
