//! Artifacts produced for each intake request: the one-page PDF summary
//! and the optional QR code image.

pub mod error;
pub mod pdf;
pub mod qr;

pub use error::DocumentError;
pub use pdf::{render_summary, Summary, SummaryEntry, Watermark};
pub use qr::qr_png;
