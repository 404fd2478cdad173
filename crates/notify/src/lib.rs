//! Result notification for intake requests.
//!
//! - [`Mailer`] is the seam the request pipeline sends through.
//! - [`SmtpMailer`] delivers over SMTP with STARTTLS using `lettre`.
//! - [`DeliveryStatus`] records what happened to each request's email.

pub mod email;
pub mod error;

use std::fmt;

use async_trait::async_trait;

pub use email::{EmailAttachment, EmailConfig, OutgoingEmail, SmtpMailer};
pub use error::DeliveryError;

/// Sends a fully assembled email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError>;
}

/// Outcome of the notification step for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent { to: String },
    Skipped { reason: String },
    Failed { reason: String },
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent { to } => write!(f, "Results emailed to {to}"),
            Self::Skipped { reason } => write!(f, "Email not sent: {reason}"),
            Self::Failed { reason } => write!(f, "Email delivery failed: {reason}"),
        }
    }
}
