use std::path::PathBuf;

use intake_core::extraction::DEFAULT_INCOME_THRESHOLD;
use intake_core::upload::UploadNaming;

/// Default request body limit: 20 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Tracing filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str =
    "intake_api=debug,intake_ocr=debug,intake_notify=info,tower_http=debug";

/// Default subject line for result emails.
pub const DEFAULT_EMAIL_SUBJECT: &str = "Your application results";

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. Malformed
/// values fail fast at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
    /// Maximum accepted request body size in bytes.
    pub max_upload_bytes: usize,
    /// Where accepted uploads are written.
    pub upload_dir: PathBuf,
    /// Parent of the per-request artifact directories.
    pub output_dir: PathBuf,
    pub upload_naming: UploadNaming,
    /// Amounts at or above this are approved.
    pub income_threshold: f64,
    /// Optional image drawn on the summary page.
    pub watermark_path: Option<PathBuf>,
    /// Text encoded in the QR code. No QR code is produced when unset.
    pub qr_payload: Option<String>,
    pub email_subject: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `5000`                     |
    /// | `REQUEST_TIMEOUT_SECS` | `60`                       |
    /// | `MAX_UPLOAD_BYTES`     | `20971520`                 |
    /// | `UPLOAD_DIR`           | `uploads`                  |
    /// | `OUTPUT_DIR`           | `output`                   |
    /// | `UPLOAD_NAMING`        | `random-suffix`            |
    /// | `INCOME_THRESHOLD`     | `4000`                     |
    /// | `WATERMARK_IMAGE_PATH` | --                         |
    /// | `QR_PAYLOAD`           | --                         |
    /// | `EMAIL_SUBJECT`        | `Your application results` |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .map(|v| v.parse().expect("MAX_UPLOAD_BYTES must be a valid usize"))
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let upload_dir = PathBuf::from(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()));
        let output_dir = PathBuf::from(std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "output".into()));

        let upload_naming = std::env::var("UPLOAD_NAMING")
            .map(|v| {
                v.parse::<UploadNaming>()
                    .unwrap_or_else(|e| panic!("UPLOAD_NAMING is invalid: {e}"))
            })
            .unwrap_or_default();

        let income_threshold: f64 = std::env::var("INCOME_THRESHOLD")
            .map(|v| v.parse().expect("INCOME_THRESHOLD must be a number"))
            .unwrap_or(DEFAULT_INCOME_THRESHOLD);

        let watermark_path = non_empty_var("WATERMARK_IMAGE_PATH").map(PathBuf::from);
        let qr_payload = non_empty_var("QR_PAYLOAD");
        let email_subject =
            non_empty_var("EMAIL_SUBJECT").unwrap_or_else(|| DEFAULT_EMAIL_SUBJECT.into());

        Self {
            host,
            port,
            request_timeout_secs,
            max_upload_bytes,
            upload_dir,
            output_dir,
            upload_naming,
            income_threshold,
            watermark_path,
            qr_payload,
            email_subject,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
