//! Text extraction for uploaded document images.
//!
//! - [`TextExtractor`] is the seam the request pipeline calls.
//! - [`VisionClient`] implements it against the Google Cloud Vision
//!   `images:annotate` REST endpoint.
//! - [`credentials`] handles API-key and service-account authentication.

pub mod credentials;
pub mod error;
pub mod vision;

use async_trait::async_trait;

pub use credentials::{ServiceAccountKey, VisionAuth};
pub use error::OcrError;
pub use vision::{VisionClient, VisionConfig};

/// Converts raw image bytes into machine text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Extractor used when no OCR credentials are configured.
///
/// Every call fails, so each document surfaces the processing-error
/// record instead of the server refusing to start.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredExtractor;

#[async_trait]
impl TextExtractor for UnconfiguredExtractor {
    async fn extract_text(&self, _image: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::NotConfigured)
    }
}
