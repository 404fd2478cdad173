//! Field extraction and decisioning over OCR text.
//!
//! Two independent searches run over the raw text: one for a dollar
//! `Amount`, classified against an income threshold, and one for a `DLN`
//! identifier. Each search contributes exactly one [`ExtractionRecord`],
//! either a match or an `error` marker.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Amounts at or above this value are approved.
pub const DEFAULT_INCOME_THRESHOLD: f64 = 4000.0;

/// `Amount`, an optional line break, then `$` and a figure with exactly
/// two decimal digits. Thousands separators are allowed. Digits are ASCII
/// only; other scripts' digits do not match.
pub const AMOUNT_PATTERN: &str = r"(?i)Amount\s*\n?\s*\$\s*([0-9,]+\.[0-9]{2})";

/// `DLN` followed by a word token.
pub const DLN_PATTERN: &str = r"(?i)DLN\s*(\w+)";

pub const AMOUNT_NOT_FOUND: &str = "Integer not found";
pub const DLN_NOT_FOUND: &str = "DLN not found";
pub const PROCESSING_FAILED: &str = "Error processing image";

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(AMOUNT_PATTERN).expect("valid regex"));

static DLN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(DLN_PATTERN).expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Approved,
    Denied,
    Processed,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Denied => "Denied",
            Self::Processed => "Processed",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One result line for a processed document.
///
/// Serialises to `{income, decision}`, `{dln, decision}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractionRecord {
    Income { income: f64, decision: Decision },
    Dln { dln: String, decision: Decision },
    Error { error: String },
}

impl ExtractionRecord {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// The record produced when text extraction fails outright.
    pub fn processing_failed() -> Vec<Self> {
        vec![Self::error(PROCESSING_FAILED)]
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// One-line description, shared by the results page and the PDF.
    pub fn summary(&self) -> String {
        match self {
            Self::Income { income, decision } => format!("Income: ${income:.2} - {decision}"),
            Self::Dln { dln, decision } => format!("DLN: {dln} - {decision}"),
            Self::Error { error } => format!("Error: {error}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Classify an amount against `threshold`.
pub fn decide(amount: f64, threshold: f64) -> Decision {
    if amount >= threshold {
        Decision::Approved
    } else {
        Decision::Denied
    }
}

/// Find the first `Amount $x.yy` figure, with commas removed.
pub fn find_amount(text: &str) -> Option<f64> {
    let caps = AMOUNT_RE.captures(text)?;
    caps[1].replace(',', "").parse().ok()
}

/// Find the first token following `DLN`.
pub fn find_dln(text: &str) -> Option<&str> {
    DLN_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Run both searches over `text`.
///
/// Always returns two records: the amount result first, the identifier
/// result second.
pub fn extract_fields(text: &str, threshold: f64) -> Vec<ExtractionRecord> {
    let amount = match find_amount(text) {
        Some(income) => ExtractionRecord::Income {
            income,
            decision: decide(income, threshold),
        },
        None => ExtractionRecord::error(AMOUNT_NOT_FOUND),
    };

    let dln = match find_dln(text) {
        Some(dln) => ExtractionRecord::Dln {
            dln: dln.to_string(),
            decision: Decision::Processed,
        },
        None => ExtractionRecord::error(DLN_NOT_FOUND),
    };

    vec![amount, dln]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
