//! One-page PDF summary of an intake request.
//!
//! The page is laid out top-down as a list of [`TextLine`]s (see
//! [`layout`]) and then encoded with `lopdf` using the standard Helvetica
//! fonts, so no font files are embedded. An optional watermark image is
//! drawn in the bottom-right corner.

use intake_core::extraction::ExtractionRecord;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::DocumentError;

// ---------------------------------------------------------------------------
// Page geometry
// ---------------------------------------------------------------------------

/// A4 in points.
pub const PAGE_WIDTH: i64 = 595;
pub const PAGE_HEIGHT: i64 = 842;

const MARGIN: i64 = 56;
const HEADER_SIZE: i64 = 20;
const SECTION_SIZE: i64 = 13;
const BODY_SIZE: i64 = 11;
const DISCLAIMER_SIZE: i64 = 9;
const RECORD_INDENT: i64 = 16;

/// Characters per disclaimer line at [`DISCLAIMER_SIZE`].
const DISCLAIMER_WRAP: usize = 100;

/// Rendered width of the watermark in points; height keeps the aspect ratio.
const WATERMARK_WIDTH: i64 = 120;

pub const HEADER_TEXT: &str = "Application Results";

pub const LEGAL_DISCLAIMER: &str = "This summary was generated automatically from the documents \
    submitted with your application. Amounts and identifiers were read by an automated text \
    recognition service and may contain errors. The decision shown is preliminary, does not \
    constitute an offer, approval of credit, or a binding agreement, and may be revised after \
    manual review. By signing below you confirm that the documents you submitted are authentic \
    and that the information they contain is accurate to the best of your knowledge.";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Results for one uploaded document.
#[derive(Debug, Clone)]
pub struct SummaryEntry<'a> {
    pub title: &'a str,
    pub records: &'a [ExtractionRecord],
}

/// Everything printed on the summary page.
#[derive(Debug, Clone)]
pub struct Summary<'a> {
    pub entries: Vec<SummaryEntry<'a>>,
    pub signature: &'a str,
    pub sign_date: &'a str,
}

/// A decoded watermark, ready to embed as an RGB image XObject.
///
/// Images with an alpha channel keep it as a separate 8-bit soft mask.
#[derive(Debug, Clone)]
pub struct Watermark {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl Watermark {
    /// Decode PNG, JPEG or GIF bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, DocumentError> {
        let decoded = image::load_from_memory(bytes)?;
        let (width, height) = (decoded.width(), decoded.height());

        if !decoded.color().has_alpha() {
            return Ok(Self {
                width,
                height,
                rgb: decoded.to_rgb8().into_raw(),
                alpha: None,
            });
        }

        let rgba = decoded.to_rgba8().into_raw();
        let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
        let mut alpha = Vec::with_capacity(rgba.len() / 4);
        for pixel in rgba.chunks_exact(4) {
            rgb.extend_from_slice(&pixel[..3]);
            alpha.push(pixel[3]);
        }
        Ok(Self {
            width,
            height,
            rgb,
            alpha: Some(alpha),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Size on the page in points.
    fn placed_size(&self) -> (i64, i64) {
        let width = WATERMARK_WIDTH;
        let height = if self.width == 0 {
            0
        } else {
            WATERMARK_WIDTH * i64::from(self.height) / i64::from(self.width)
        };
        (width, height)
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

/// A single positioned line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub font: Font,
    pub size: i64,
    pub x: i64,
    pub y: i64,
    pub text: String,
}

/// Rough Helvetica advance: half an em per character.
fn estimated_width(text: &str, size: i64) -> i64 {
    text.chars().count() as i64 * size / 2
}

/// Greedy word wrap to at most `max_chars` per line.
///
/// A single word longer than `max_chars` gets a line of its own.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Position every text line on the page, top to bottom.
pub fn layout(summary: &Summary<'_>) -> Vec<TextLine> {
    let mut lines = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN - HEADER_SIZE;

    let mut push = |font: Font, size: i64, x: i64, y: i64, text: String| {
        lines.push(TextLine {
            font,
            size,
            x,
            y,
            text,
        });
    };

    let header_x = (PAGE_WIDTH - estimated_width(HEADER_TEXT, HEADER_SIZE)) / 2;
    push(Font::Bold, HEADER_SIZE, header_x, y, HEADER_TEXT.to_string());
    y -= HEADER_SIZE * 2;

    for entry in &summary.entries {
        push(Font::Bold, SECTION_SIZE, MARGIN, y, entry.title.to_string());
        y -= SECTION_SIZE + 6;
        for record in entry.records {
            push(
                Font::Regular,
                BODY_SIZE,
                MARGIN + RECORD_INDENT,
                y,
                record.summary(),
            );
            y -= BODY_SIZE + 5;
        }
        y -= BODY_SIZE;
    }

    push(
        Font::Bold,
        BODY_SIZE,
        MARGIN,
        y,
        "Legal Disclaimer".to_string(),
    );
    y -= BODY_SIZE + 4;
    for line in wrap_text(LEGAL_DISCLAIMER, DISCLAIMER_WRAP) {
        push(Font::Regular, DISCLAIMER_SIZE, MARGIN, y, line);
        y -= DISCLAIMER_SIZE + 3;
    }
    y -= BODY_SIZE * 2;

    push(
        Font::Regular,
        BODY_SIZE,
        MARGIN,
        y,
        format!("Signature: {}", summary.signature),
    );
    y -= BODY_SIZE + 5;
    push(
        Font::Regular,
        BODY_SIZE,
        MARGIN,
        y,
        format!("Date: {}", summary.sign_date),
    );

    lines
}

/// Encode text for the WinAnsi-encoded standard fonts.
///
/// Printable ASCII and U+00A0..=U+00FF map to the same byte values;
/// anything else becomes `?`.
fn pdf_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            0x20..=0x7E | 0xA0..=0xFF => u32::from(c) as u8,
            _ => b'?',
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_error(err: impl std::fmt::Display) -> DocumentError {
    DocumentError::Render(err.to_string())
}

fn content_operations(lines: &[TextLine], watermark: Option<&Watermark>) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(lines.len() * 5 + 4);

    for line in lines {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![
                line.font.resource_name().into(),
                Object::Integer(line.size),
            ],
        ));
        ops.push(Operation::new(
            "Td",
            vec![Object::Integer(line.x), Object::Integer(line.y)],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(pdf_text(&line.text))],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    if let Some(mark) = watermark {
        let (width, height) = mark.placed_size();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![
                Object::Integer(width),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(height),
                Object::Integer(PAGE_WIDTH - MARGIN - width),
                Object::Integer(MARGIN),
            ],
        ));
        ops.push(Operation::new("Do", vec!["Im1".into()]));
        ops.push(Operation::new("Q", vec![]));
    }

    ops
}

/// Render the summary page to PDF bytes.
pub fn render_summary(
    summary: &Summary<'_>,
    watermark: Option<&Watermark>,
) -> Result<Vec<u8>, DocumentError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut resources = dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    };

    if let Some(mark) = watermark {
        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(i64::from(mark.width)),
            "Height" => Object::Integer(i64::from(mark.height)),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
        };
        if let Some(alpha) = &mark.alpha {
            let mask_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => Object::Integer(i64::from(mark.width)),
                    "Height" => Object::Integer(i64::from(mark.height)),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => Object::Integer(8),
                },
                alpha.clone(),
            ));
            image_dict.set("SMask", mask_id);
        }
        let image_id = doc.add_object(Stream::new(image_dict, mark.rgb.clone()));
        resources.set("XObject", dictionary! { "Im1" => image_id });
    }
    let resources_id = doc.add_object(resources);

    let content = Content {
        operations: content_operations(&layout(summary), watermark),
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().map_err(render_error)?,
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => Object::Integer(1),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(HEADER_TEXT),
        "Producer" => Object::string_literal("intake-documents"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(render_error)?;
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use intake_core::extraction::{Decision, ExtractionRecord};

    use super::*;

    fn records() -> Vec<ExtractionRecord> {
        vec![
            ExtractionRecord::Income {
                income: 4200.0,
                decision: Decision::Approved,
            },
            ExtractionRecord::error("DLN not found"),
        ]
    }

    fn summary(records: &[ExtractionRecord]) -> Summary<'_> {
        Summary {
            entries: vec![SummaryEntry {
                title: "Pay stub",
                records,
            }],
            signature: "Jane Doe",
            sign_date: "2026-10-14",
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_text("one two three four five six", 9);
        assert_eq!(lines, vec!["one two", "three", "four five", "six"]);
        assert!(lines.iter().all(|l| l.len() <= 9));
    }

    #[test]
    fn wrap_keeps_long_words_whole() {
        assert_eq!(wrap_text("a supercalifragilistic b", 5), vec!["a", "supercalifragilistic", "b"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn header_is_first_and_centered() {
        let records = records();
        let lines = layout(&summary(&records));
        let header = &lines[0];
        assert_eq!(header.text, HEADER_TEXT);
        let width = estimated_width(HEADER_TEXT, HEADER_SIZE);
        assert!((header.x + width / 2 - PAGE_WIDTH / 2).abs() <= 1);
    }

    #[test]
    fn layout_lists_records_then_disclaimer_then_signature() {
        let records = records();
        let lines = layout(&summary(&records));
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();

        let pos = |needle: &str| texts.iter().position(|t| t.starts_with(needle)).unwrap();
        assert!(pos("Pay stub") < pos("Income: $4200.00 - Approved"));
        assert!(pos("Income:") < pos("Error: DLN not found"));
        assert!(pos("Error:") < pos("Legal Disclaimer"));
        assert!(pos("Legal Disclaimer") < pos("Signature: Jane Doe"));
        assert_eq!(texts.last(), Some(&"Date: 2026-10-14"));
    }

    #[test]
    fn layout_moves_strictly_down_the_page() {
        let records = records();
        let lines = layout(&summary(&records));
        assert!(lines.windows(2).all(|w| w[1].y < w[0].y));
        assert!(lines.iter().all(|l| l.y > MARGIN));
    }

    #[test]
    fn disclaimer_is_fully_present() {
        let records = records();
        let lines = layout(&summary(&records));
        let rejoined = lines
            .iter()
            .filter(|l| l.size == DISCLAIMER_SIZE)
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let expected = LEGAL_DISCLAIMER.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(rejoined, expected);
    }

    #[test]
    fn latin1_text_maps_to_winansi_bytes() {
        assert_eq!(pdf_text("Zoë"), b"Zo\xEB".to_vec());
        assert_eq!(pdf_text("José Núñez £5"), b"Jos\xE9 N\xFA\xF1ez \xA35".to_vec());
    }

    #[test]
    fn text_outside_winansi_is_replaced() {
        assert_eq!(pdf_text("Zoë\t1"), b"Zo\xEB?1".to_vec());
        assert_eq!(pdf_text("Łódź €"), b"?\xF3d? ?".to_vec());
    }

    #[test]
    fn renders_a_single_page_pdf() {
        let records = records();
        let bytes = render_summary(&summary(&records), None).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert!(!bytes.windows(5).any(|w| w == b"Image"));
    }

    #[test]
    fn watermark_is_embedded_as_image() {
        let mark = Watermark::decode(&png_bytes(40, 20)).unwrap();
        assert_eq!(mark.dimensions(), (40, 20));
        assert_eq!(mark.placed_size(), (WATERMARK_WIDTH, WATERMARK_WIDTH / 2));

        let records = records();
        let bytes = render_summary(&summary(&records), Some(&mark)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert!(bytes.windows(5).any(|w| w == b"Image"));
    }

    #[test]
    fn opaque_watermark_has_no_soft_mask() {
        let mark = Watermark::decode(&png_bytes(8, 8)).unwrap();
        assert!(!mark.has_alpha());

        let records = records();
        let bytes = render_summary(&summary(&records), Some(&mark)).unwrap();
        assert!(!bytes.windows(5).any(|w| w == b"SMask"));
    }

    #[test]
    fn transparent_watermark_carries_soft_mask() {
        let img = image::RgbaImage::from_fn(4, 2, |x, _| {
            image::Rgba([10, 20, 30, if x < 2 { 0 } else { 255 }])
        });
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let mark = Watermark::decode(&png).unwrap();
        assert!(mark.has_alpha());
        assert_eq!(mark.rgb, [10u8, 20, 30].repeat(8));
        assert_eq!(mark.alpha.as_deref(), Some(&[0, 0, 255, 255, 0, 0, 255, 255][..]));

        let records = records();
        let bytes = render_summary(&summary(&records), Some(&mark)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let image = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .find(|s| s.dict.get(b"ColorSpace").and_then(|c| c.as_name()).ok() == Some(&b"DeviceRGB"[..]))
            .unwrap();
        let mask_id = image.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
        assert_eq!(mask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
    }

    #[test]
    fn undecodable_watermark_is_an_image_error() {
        let err = Watermark::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, DocumentError::Image(_)));
    }
}
