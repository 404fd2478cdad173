/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// `EMAIL_ADDRESS` or `EMAIL_PASSWORD` is not set.
    #[error("Email credentials not loaded")]
    MissingCredentials,

    /// An email setting is present but malformed.
    #[error("Invalid email configuration: {0}")]
    InvalidConfig(String),

    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}
