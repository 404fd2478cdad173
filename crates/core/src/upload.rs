//! Upload validation and stored-filename rules.
//!
//! The multipart handler collects the submitted parts into an
//! [`UploadForm`]; [`UploadForm::documents`] then decides which documents
//! the request carries and rejects it with an [`UploadRejection`] when a
//! part is missing, unnamed, or of a disallowed type.

use std::collections::HashMap;
use std::str::FromStr;

use rand::Rng;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// File extensions accepted for upload (lowercase, without the dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "pdf", "png", "jpg", "jpeg", "gif"];

/// Length of the random token appended by [`UploadNaming::RandomSuffix`].
pub const RANDOM_SUFFIX_LENGTH: usize = 8;

/// Multipart field names for the uploaded documents.
pub mod fields {
    pub const PAYSTUB: &str = "paystub";
    pub const ID: &str = "id";
    pub const FILE: &str = "file";
    pub const EMAIL: &str = "email";
    pub const SIGNATURE: &str = "signature";
    pub const SIGN_DATE: &str = "sign_date";
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Reasons an upload is refused before any processing happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("No file part in request")]
    NoFilePart,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("File type not allowed")]
    FileTypeNotAllowed,
}

// ---------------------------------------------------------------------------
// Extension checks
// ---------------------------------------------------------------------------

/// Return the lowercase extension after the final `.`, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_lowercase())
}

/// Whether `filename` carries an extension from [`ALLOWED_EXTENSIONS`].
pub fn allowed_file(filename: &str) -> bool {
    file_extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Strip any directory components a client put in the filename.
///
/// Both `/` and `\` count as separators so Windows-style browser paths
/// are reduced as well.
pub fn client_basename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
}

// ---------------------------------------------------------------------------
// Stored filenames
// ---------------------------------------------------------------------------

/// How uploaded files are named on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadNaming {
    /// Keep the client filename exactly.
    Original,
    /// Insert `_{token}` before the extension.
    #[default]
    RandomSuffix,
}

impl FromStr for UploadNaming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "random-suffix" | "random_suffix" | "random" => Ok(Self::RandomSuffix),
            other => Err(format!(
                "Unknown upload naming '{other}' (expected 'original' or 'random-suffix')"
            )),
        }
    }
}

impl UploadNaming {
    /// Produce the on-disk filename for a validated client filename.
    pub fn stored_name(self, filename: &str) -> String {
        match self {
            Self::Original => filename.to_string(),
            Self::RandomSuffix => {
                let token: String = rand::rng()
                    .sample_iter(&rand::distr::Alphanumeric)
                    .take(RANDOM_SUFFIX_LENGTH)
                    .map(char::from)
                    .collect();
                with_suffix(filename, &token)
            }
        }
    }
}

/// Insert `_{suffix}` between the stem and the extension of `filename`.
pub fn with_suffix(filename: &str, suffix: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{filename}_{suffix}"),
    }
}

// ---------------------------------------------------------------------------
// Form model
// ---------------------------------------------------------------------------

/// The document a file part carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    Paystub,
    Id,
    /// The single-document upload variant.
    File,
}

impl DocumentRole {
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Paystub => fields::PAYSTUB,
            Self::Id => fields::ID,
            Self::File => fields::FILE,
        }
    }

    /// Human-readable label for pages and the PDF summary.
    pub fn label(self) -> &'static str {
        match self {
            Self::Paystub => "Pay stub",
            Self::Id => "Identification",
            Self::File => "Document",
        }
    }
}

/// A file part as received, before validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client filename with directory components removed.
    pub filename: String,
    pub data: Vec<u8>,
}

/// A file part that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedDocument {
    pub role: DocumentRole,
    pub filename: String,
    pub extension: String,
    pub data: Vec<u8>,
}

/// Everything a `POST /upload` request submitted.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub files: HashMap<DocumentRole, UploadedFile>,
    pub email: Option<String>,
    pub signature: Option<String>,
    pub sign_date: Option<String>,
}

impl UploadForm {
    /// Record a file part under the role its field name maps to.
    ///
    /// Returns `false` for field names that are not document fields.
    pub fn insert_file(&mut self, field_name: &str, filename: &str, data: Vec<u8>) -> bool {
        let role = match field_name {
            fields::PAYSTUB => DocumentRole::Paystub,
            fields::ID => DocumentRole::Id,
            fields::FILE => DocumentRole::File,
            _ => return false,
        };
        self.files.insert(
            role,
            UploadedFile {
                filename: client_basename(filename).to_string(),
                data,
            },
        );
        true
    }

    /// Record a text field. Blank values are treated as absent.
    pub fn insert_text(&mut self, field_name: &str, value: String) -> bool {
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match field_name {
            fields::EMAIL => self.email = value,
            fields::SIGNATURE => self.signature = value,
            fields::SIGN_DATE => self.sign_date = value,
            _ => return false,
        }
        true
    }

    /// The roles this form must carry.
    ///
    /// A lone `file` part selects the single-document variant; otherwise
    /// both `paystub` and `id` are required.
    pub fn required_roles(&self) -> &'static [DocumentRole] {
        let has_pair_part = self.files.contains_key(&DocumentRole::Paystub)
            || self.files.contains_key(&DocumentRole::Id);
        if !has_pair_part && self.files.contains_key(&DocumentRole::File) {
            &[DocumentRole::File]
        } else {
            &[DocumentRole::Paystub, DocumentRole::Id]
        }
    }

    /// Validate the form and take its documents, in role order.
    ///
    /// Checks run across all required parts in stages: presence first, then
    /// non-empty filenames, then extensions.
    pub fn documents(&mut self) -> Result<Vec<ValidatedDocument>, UploadRejection> {
        let roles = self.required_roles();

        if roles.iter().any(|role| !self.files.contains_key(role)) {
            return Err(UploadRejection::NoFilePart);
        }
        if roles.iter().any(|role| self.files[role].filename.is_empty()) {
            return Err(UploadRejection::NoSelectedFile);
        }
        if roles.iter().any(|role| !allowed_file(&self.files[role].filename)) {
            return Err(UploadRejection::FileTypeNotAllowed);
        }

        let mut documents = Vec::with_capacity(roles.len());
        for &role in roles {
            let Some(file) = self.files.remove(&role) else {
                return Err(UploadRejection::NoFilePart);
            };
            let extension = file_extension(&file.filename).unwrap_or_default();
            documents.push(ValidatedDocument {
                role,
                filename: file.filename,
                extension,
                data: file.data,
            });
        }
        Ok(documents)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
