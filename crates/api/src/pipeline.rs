//! The per-request intake pipeline.
//!
//! `run_intake` takes a parsed [`UploadForm`] through validation, storage,
//! OCR, field extraction, artifact rendering and notification. Every
//! request writes its artifacts into its own `{OUTPUT_DIR}/{uuid}`
//! directory so concurrent requests never share files.

use std::path::{Path, PathBuf};

use intake_core::error::CoreError;
use intake_core::extraction::{extract_fields, ExtractionRecord};
use intake_core::upload::{DocumentRole, UploadForm, ValidatedDocument};
use intake_documents::{qr_png, render_summary, DocumentError, Summary, SummaryEntry, Watermark};
use intake_notify::{DeliveryStatus, EmailAttachment, OutgoingEmail};
use intake_ocr::TextExtractor;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const RESULTS_PDF: &str = "results.pdf";
pub const QR_CODE_PNG: &str = "qr_code.png";

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// What happened to one uploaded document.
#[derive(Debug, Clone)]
pub struct DocumentResult {
    pub role: DocumentRole,
    pub stored_path: PathBuf,
    pub records: Vec<ExtractionRecord>,
    /// OCR failed and `records` holds only the processing error.
    pub read_failed: bool,
}

/// Everything the results page reports for one request.
#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    pub request_id: Uuid,
    pub documents: Vec<DocumentResult>,
    pub pdf_path: PathBuf,
    pub qr_path: Option<PathBuf>,
    pub delivery: DeliveryStatus,
}

/// Rendered artifact bytes.
#[derive(Debug)]
pub struct Artifacts {
    pub pdf: Vec<u8>,
    pub qr: Option<Vec<u8>>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run one upload through the whole workflow.
///
/// Upload rejections are returned as errors. OCR and email failures are
/// not: they are reported in the outcome.
pub async fn run_intake(state: &AppState, mut form: UploadForm) -> AppResult<IntakeOutcome> {
    let config = state.config.as_ref();

    let documents = form.documents().map_err(|rejection| {
        tracing::info!(reason = %rejection, "Upload rejected");
        AppError::Core(rejection.into())
    })?;

    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, documents = documents.len(), "Processing upload");

    let mut results = Vec::with_capacity(documents.len());
    for document in documents {
        let stored_path = store_upload(config, &document).await?;
        let (records, read_failed) =
            extract_records(state.extractor.as_ref(), &document.data, config.income_threshold)
                .await;
        for record in &records {
            tracing::info!(%request_id, role = ?document.role, result = %record.summary(), "Document processed");
        }
        results.push(DocumentResult {
            role: document.role,
            stored_path,
            records,
            read_failed,
        });
    }

    let signature = form.signature.take().unwrap_or_default();
    let sign_date = form.sign_date.take().unwrap_or_else(today);
    let watermark = read_watermark(config.watermark_path.as_deref()).await;

    let artifacts = {
        let documents = results.clone();
        let qr_payload = config.qr_payload.clone();
        tokio::task::spawn_blocking(move || {
            render_artifacts(
                &documents,
                &signature,
                &sign_date,
                watermark.as_deref(),
                qr_payload.as_deref(),
            )
        })
        .await
        .map_err(render_failed)?
        .map_err(render_failed)?
    };

    let request_dir = config.output_dir.join(request_id.to_string());
    create_dir(&request_dir).await?;

    let pdf_path = request_dir.join(RESULTS_PDF);
    write_file(&pdf_path, &artifacts.pdf).await?;

    let qr_path = match &artifacts.qr {
        Some(png) => {
            let path = request_dir.join(QR_CODE_PNG);
            write_file(&path, png).await?;
            Some(path)
        }
        None => None,
    };

    let delivery = deliver(state, form.email.as_deref(), &results, artifacts).await;
    tracing::info!(%request_id, delivery = %delivery, "Upload complete");

    Ok(IntakeOutcome {
        request_id,
        documents: results,
        pdf_path,
        qr_path,
        delivery,
    })
}

/// OCR one document and extract its fields.
///
/// Returns the records and whether the OCR step failed. Any OCR failure
/// collapses into the single processing-error record.
pub async fn extract_records(
    extractor: &dyn TextExtractor,
    image: &[u8],
    threshold: f64,
) -> (Vec<ExtractionRecord>, bool) {
    match extractor.extract_text(image).await {
        Ok(text) => (extract_fields(&text, threshold), false),
        Err(e) => {
            tracing::warn!(error = %e, "Text extraction failed");
            (ExtractionRecord::processing_failed(), true)
        }
    }
}

/// Write a validated upload into the upload directory.
async fn store_upload(config: &ServerConfig, document: &ValidatedDocument) -> AppResult<PathBuf> {
    create_dir(&config.upload_dir).await?;
    let path = config
        .upload_dir
        .join(config.upload_naming.stored_name(&document.filename));
    write_file(&path, &document.data).await?;
    tracing::debug!(role = ?document.role, path = %path.display(), bytes = document.data.len(), "Stored upload");
    Ok(path)
}

/// Read the configured watermark. A missing or unreadable file is skipped.
async fn read_watermark(path: Option<&Path>) -> Option<Vec<u8>> {
    let path = path?;
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Watermark image unreadable, rendering without it");
            None
        }
    }
}

/// Render the summary PDF and, when a payload is configured, the QR code.
///
/// CPU-bound; callers run it on the blocking pool. An undecodable
/// watermark or an unencodable QR payload is logged and left out.
pub fn render_artifacts(
    documents: &[DocumentResult],
    signature: &str,
    sign_date: &str,
    watermark: Option<&[u8]>,
    qr_payload: Option<&str>,
) -> Result<Artifacts, DocumentError> {
    let watermark = watermark.and_then(|bytes| match Watermark::decode(bytes) {
        Ok(image) => Some(image),
        Err(e) => {
            tracing::warn!(error = %e, "Watermark image could not be decoded, rendering without it");
            None
        }
    });

    let summary = Summary {
        entries: documents
            .iter()
            .map(|d| SummaryEntry {
                title: d.role.label(),
                records: &d.records,
            })
            .collect(),
        signature,
        sign_date,
    };
    let pdf = render_summary(&summary, watermark.as_ref())?;

    let qr = qr_payload.and_then(|payload| match qr_png(payload) {
        Ok(png) => Some(png),
        Err(e) => {
            tracing::warn!(error = %e, "QR code could not be generated");
            None
        }
    });

    Ok(Artifacts { pdf, qr })
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// Build the result email for `to`.
pub fn result_email(
    to: &str,
    subject: &str,
    documents: &[DocumentResult],
    artifacts: Artifacts,
) -> OutgoingEmail {
    let mut body = String::from("Thank you for your application. Your results are below.\n\n");
    for document in documents {
        body.push_str(document.role.label());
        body.push('\n');
        for record in &document.records {
            body.push_str("  ");
            body.push_str(&record.summary());
            body.push('\n');
        }
    }
    body.push_str("\nThe results summary is attached.\n");

    let mut attachments = vec![EmailAttachment {
        filename: RESULTS_PDF.to_string(),
        content_type: "application/pdf".to_string(),
        data: artifacts.pdf,
    }];
    if let Some(png) = artifacts.qr {
        attachments.push(EmailAttachment {
            filename: QR_CODE_PNG.to_string(),
            content_type: "image/png".to_string(),
            data: png,
        });
    }

    OutgoingEmail {
        to: to.to_string(),
        subject: subject.to_string(),
        body,
        attachments,
    }
}

async fn deliver(
    state: &AppState,
    to: Option<&str>,
    documents: &[DocumentResult],
    artifacts: Artifacts,
) -> DeliveryStatus {
    let Some(to) = to else {
        return DeliveryStatus::Skipped {
            reason: "no email address was provided".into(),
        };
    };
    let Some(mailer) = state.mailer.as_ref() else {
        tracing::error!(to, "Email credentials not loaded");
        return DeliveryStatus::Skipped {
            reason: "email delivery is not configured".into(),
        };
    };

    let email = result_email(to, &state.config.email_subject, documents, artifacts);
    match mailer.send(&email).await {
        Ok(()) => DeliveryStatus::Sent { to: to.to_string() },
        Err(e) => {
            tracing::error!(to, error = %e, "Failed to send result email");
            DeliveryStatus::Failed {
                reason: "the mail server did not accept the message".into(),
            }
        }
    }
}

fn render_failed(err: impl std::fmt::Display) -> AppError {
    CoreError::Internal(format!("Failed to render results: {err}")).into()
}

// ---------------------------------------------------------------------------
// Filesystem helpers
// ---------------------------------------------------------------------------

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

async fn create_dir(path: &Path) -> AppResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create {}: {e}", path.display())))
}

async fn write_file(path: &Path, data: &[u8]) -> AppResult<()> {
    tokio::fs::write(path, data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to write {}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
