/// Errors raised while producing request artifacts.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The PDF object tree could not be encoded or written.
    #[error("PDF render error: {0}")]
    Render(String),

    /// An image could not be decoded or encoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The QR payload does not fit in any QR version.
    #[error("QR code error: {0}")]
    Qr(#[from] qrcode::types::QrError),
}
