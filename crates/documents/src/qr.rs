//! QR code rendering to PNG.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::DocumentError;

/// Pixels per QR module.
pub const QR_BOX_SIZE: u32 = 10;

/// Quiet-zone width in modules.
pub const QR_BORDER: u32 = 4;

/// Encode `data` as a black-on-white QR code PNG.
///
/// Uses error correction level L and the smallest version that fits.
pub fn qr_png(data: &str) -> Result<Vec<u8>, DocumentError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)?;
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let side = (modules + 2 * QR_BORDER) * QR_BOX_SIZE;

    let img = GrayImage::from_fn(side, side, |x, y| {
        let mx = (x / QR_BOX_SIZE).checked_sub(QR_BORDER);
        let my = (y / QR_BOX_SIZE).checked_sub(QR_BORDER);
        let dark = match (mx, my) {
            (Some(mx), Some(my)) if mx < modules && my < modules => {
                matches!(colors[(my * modules + mx) as usize], Color::Dark)
            }
            _ => false,
        };
        if dark {
            Luma([0])
        } else {
            Luma([255])
        }
    });

    let mut buf = Vec::new();
    image::DynamicImage::ImageLuma8(img).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
