#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use intake_api::config::ServerConfig;
use intake_api::router::build_app_router;
use intake_api::state::AppState;
use intake_core::upload::UploadNaming;
use intake_notify::{DeliveryError, Mailer, OutgoingEmail};
use intake_ocr::{OcrError, TextExtractor};

/// Image bytes that make [`EchoExtractor`] fail.
pub const UNREADABLE: &[u8] = b"\x00unreadable";

/// Treats every upload as UTF-8 text, failing on [`UNREADABLE`].
pub struct EchoExtractor;

#[async_trait]
impl TextExtractor for EchoExtractor {
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        if image == UNREADABLE {
            return Err(OcrError::Service("Bad image data.".into()));
        }
        Ok(String::from_utf8_lossy(image).into_owned())
    }
}

/// Keeps every email it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Build("connection refused".into()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Build a test `ServerConfig` writing into `root`.
pub fn test_config(root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        upload_dir: root.join("uploads"),
        output_dir: root.join("output"),
        upload_naming: UploadNaming::RandomSuffix,
        income_threshold: 4000.0,
        watermark_path: None,
        qr_payload: None,
        email_subject: "Your application results".to_string(),
    }
}

/// Build the full application router over the given config and mailer.
pub fn build_test_app(config: ServerConfig, mailer: Option<Arc<RecordingMailer>>) -> Router {
    let state = AppState {
        config: Arc::new(config),
        extractor: Arc::new(EchoExtractor),
        mailer: mailer.map(|m| m as Arc<dyn Mailer>),
    };
    build_app_router(state)
}

// ---------------------------------------------------------------------------
// Multipart bodies
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "intake-test-boundary";

/// Hand-assembled `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.bytes
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_multipart(app: Router, uri: &str, body: MultipartBody) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body.finish()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Files directly inside `dir`, sorted by name.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
