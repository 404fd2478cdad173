//! Email delivery via SMTP.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport to send a
//! plain-text message with file attachments. Configuration is loaded from
//! environment variables; when the account credentials are missing
//! [`EmailConfig::from_env`] fails and no transport is ever built, so no
//! connection is attempted.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::DeliveryError;
use crate::Mailer;

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP relay.
pub const DEFAULT_SMTP_HOST: &str = "smtp.titan.email";

/// Default SMTP port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Configuration for the SMTP email delivery service.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Sender address, also used as the SMTP login.
    pub from_address: String,
    pub password: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("from_address", &self.from_address)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable         | Required | Default            |
    /// |------------------|----------|--------------------|
    /// | `EMAIL_ADDRESS`  | yes      | --                 |
    /// | `EMAIL_PASSWORD` | yes      | --                 |
    /// | `SMTP_HOST`      | no       | `smtp.titan.email` |
    /// | `SMTP_PORT`      | no       | `587`              |
    ///
    /// A malformed `SMTP_PORT` is [`DeliveryError::InvalidConfig`] even when
    /// the credentials are missing.
    pub fn from_env() -> Result<Self, DeliveryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DeliveryError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let smtp_port = match non_empty("SMTP_PORT") {
            Some(port) => port.trim().parse().map_err(|_| {
                DeliveryError::InvalidConfig(format!("SMTP_PORT must be a valid u16, got {port:?}"))
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let (Some(from_address), Some(password)) =
            (non_empty("EMAIL_ADDRESS"), non_empty("EMAIL_PASSWORD"))
        else {
            return Err(DeliveryError::MissingCredentials);
        };

        Ok(Self {
            smtp_host: non_empty("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port,
            from_address,
            password,
        })
    }
}

// ---------------------------------------------------------------------------
// Message model
// ---------------------------------------------------------------------------

/// A file attached to an outgoing email.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An email ready to send, independent of the transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<EmailAttachment>,
}

/// Assemble the MIME message: a plain-text part followed by attachments.
pub fn build_message(from: &str, email: &OutgoingEmail) -> Result<Message, DeliveryError> {
    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone()));

    for attachment in &email.attachments {
        let content_type = ContentType::parse(&attachment.content_type)
            .map_err(|e| DeliveryError::Build(format!("{}: {e}", attachment.content_type)))?;
        parts = parts.singlepart(
            Attachment::new(attachment.filename.clone()).body(attachment.data.clone(), content_type),
        );
    }

    Message::builder()
        .from(from.parse()?)
        .to(email.to.parse()?)
        .date_now()
        .subject(email.subject.clone())
        .multipart(parts)
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

// ---------------------------------------------------------------------------
// SmtpMailer
// ---------------------------------------------------------------------------

/// Sends emails through an authenticated STARTTLS relay.
pub struct SmtpMailer {
    from_address: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport. No connection is opened until the first send.
    pub fn new(config: EmailConfig) -> Result<Self, DeliveryError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.from_address.clone(),
                config.password,
            ))
            .build();

        Ok(Self {
            from_address: config.from_address,
            transport,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        let message = build_message(&self.from_address, email)?;
        self.transport.send(message).await?;

        tracing::info!(
            to = %email.to,
            attachments = email.attachments.len(),
            "Result email sent"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
