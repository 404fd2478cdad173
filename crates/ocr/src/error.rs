/// Errors from the OCR layer.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    /// Neither an API key nor service-account credentials were configured.
    #[error("OCR service is not configured")]
    NotConfigured,

    /// An OCR setting is present but malformed.
    #[error("Invalid OCR configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The OCR service returned a non-2xx status code.
    #[error("OCR API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// The service answered 2xx but reported an error for the image.
    #[error("OCR service error: {0}")]
    Service(String),

    /// Credentials file could not be read.
    #[error("Failed to read credentials: {0}")]
    Io(#[from] std::io::Error),

    /// Credentials or a response body were not the expected JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The service-account assertion could not be signed.
    #[error("Failed to sign token assertion: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}
