use std::sync::Arc;

use intake_notify::Mailer;
use intake_ocr::TextExtractor;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// OCR backend used for every uploaded document.
    pub extractor: Arc<dyn TextExtractor>,
    /// `None` when email credentials were not loaded at startup.
    pub mailer: Option<Arc<dyn Mailer>>,
}
