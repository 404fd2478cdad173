//! REST client for the Google Cloud Vision `images:annotate` endpoint.
//!
//! Sends one image per request with the `DOCUMENT_TEXT_DETECTION`
//! feature and returns the full-text annotation.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::credentials::{ServiceAccountKey, TokenSource, VisionAuth};
use crate::error::OcrError;
use crate::TextExtractor;

/// Default Vision API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Default outbound request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Feature requested for every image.
const FEATURE_TYPE: &str = "DOCUMENT_TEXT_DETECTION";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Configuration for [`VisionClient`].
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub endpoint: String,
    pub auth: VisionAuth,
    pub timeout_secs: u64,
}

impl VisionConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when neither credential variable is set. An API
    /// key takes precedence over a service-account file.
    ///
    /// | Env Var                          | Default                                              |
    /// |----------------------------------|------------------------------------------------------|
    /// | `OCR_API_KEY`                    | --                                                   |
    /// | `GOOGLE_APPLICATION_CREDENTIALS` | --                                                   |
    /// | `OCR_ENDPOINT`                   | `https://vision.googleapis.com/v1/images:annotate`   |
    /// | `OCR_TIMEOUT_SECS`               | `30`                                                 |
    ///
    /// A malformed `OCR_TIMEOUT_SECS` is [`OcrError::InvalidConfig`].
    pub fn from_env() -> Result<Option<Self>, OcrError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, OcrError> {
        let auth = if let Some(key) = lookup("OCR_API_KEY") {
            VisionAuth::ApiKey(key)
        } else if let Some(path) = lookup("GOOGLE_APPLICATION_CREDENTIALS") {
            VisionAuth::ServiceAccount(ServiceAccountKey::from_file(&PathBuf::from(path))?)
        } else {
            return Ok(None);
        };

        let endpoint = lookup("OCR_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let timeout_secs = match lookup("OCR_TIMEOUT_SECS") {
            Some(value) => value.trim().parse().map_err(|_| {
                OcrError::InvalidConfig(format!("OCR_TIMEOUT_SECS must be a valid u64, got {value:?}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Some(Self {
            endpoint,
            auth,
            timeout_secs,
        }))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<RpcStatus>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    message: String,
}

fn annotate_request(image: &[u8]) -> serde_json::Value {
    serde_json::json!({
        "requests": [{
            "image": { "content": BASE64_STANDARD.encode(image) },
            "features": [{ "type": FEATURE_TYPE }],
        }]
    })
}

/// Pull the full-text annotation out of a response body.
///
/// The first text annotation holds the whole page; no annotations means
/// the image contained no text.
fn response_text(body: AnnotateResponse) -> Result<String, OcrError> {
    let Some(first) = body.responses.into_iter().next() else {
        return Ok(String::new());
    };

    if let Some(status) = first.error {
        if !status.message.is_empty() {
            return Err(OcrError::Service(status.message));
        }
    }

    Ok(first
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

enum RequestAuth {
    ApiKey(String),
    Bearer(TokenSource),
}

/// HTTP client for the Vision API.
pub struct VisionClient {
    client: reqwest::Client,
    endpoint: String,
    auth: RequestAuth,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let auth = match config.auth {
            VisionAuth::ApiKey(key) => RequestAuth::ApiKey(key),
            VisionAuth::ServiceAccount(key) => RequestAuth::Bearer(TokenSource::new(key)),
        };

        Ok(Self {
            client,
            endpoint: config.endpoint,
            auth,
        })
    }

    /// Send one image for document text detection.
    pub async fn annotate(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut request = self.client.post(&self.endpoint).json(&annotate_request(image));

        request = match &self.auth {
            RequestAuth::ApiKey(key) => request.query(&[("key", key.as_str())]),
            RequestAuth::Bearer(source) => {
                request.bearer_auth(source.access_token(&self.client).await?)
            }
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(OcrError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let body: AnnotateResponse = response.json().await?;
        response_text(body)
    }
}

#[async_trait]
impl TextExtractor for VisionClient {
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        let text = self.annotate(image).await?;
        tracing::debug!(chars = text.len(), %text, "Extracted text");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    const PATH: &str = "/v1/images:annotate";

    fn client_for(server: &MockServer) -> VisionClient {
        VisionClient::new(VisionConfig {
            endpoint: server.url(PATH),
            auth: VisionAuth::ApiKey("test-key".into()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn no_credentials_means_no_config() {
        assert!(VisionConfig::from_lookup(lookup(&[("OCR_TIMEOUT_SECS", "10")]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn api_key_config_uses_defaults() {
        let config = VisionConfig::from_lookup(lookup(&[("OCR_API_KEY", "k")]))
            .unwrap()
            .unwrap();
        assert_matches!(config.auth, VisionAuth::ApiKey(key) if key == "k");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn timeout_override_is_honoured() {
        let config = VisionConfig::from_lookup(lookup(&[
            ("OCR_API_KEY", "k"),
            ("OCR_TIMEOUT_SECS", "12"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.timeout_secs, 12);
    }

    #[test]
    fn malformed_timeout_is_invalid_config() {
        for value in ["soon", "-5", "1.5"] {
            let err = VisionConfig::from_lookup(lookup(&[
                ("OCR_API_KEY", "k"),
                ("OCR_TIMEOUT_SECS", value),
            ]))
            .unwrap_err();
            assert_matches!(err, OcrError::InvalidConfig(msg) if msg.contains("OCR_TIMEOUT_SECS"));
        }
    }

    #[test]
    fn request_body_carries_base64_image_and_feature() {
        let body = annotate_request(b"abc");
        assert_eq!(body["requests"][0]["image"]["content"], "YWJj");
        assert_eq!(
            body["requests"][0]["features"][0]["type"],
            "DOCUMENT_TEXT_DETECTION"
        );
    }

    #[test]
    fn empty_responses_yield_empty_text() {
        let body: AnnotateResponse = serde_json::from_value(json!({"responses": [{}]})).unwrap();
        assert_eq!(response_text(body).unwrap(), "");
    }

    #[tokio::test]
    async fn returns_first_text_annotation() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .query_param("key", "test-key")
                    .body_contains("DOCUMENT_TEXT_DETECTION");
                then.status(200).json_body(json!({
                    "responses": [{
                        "textAnnotations": [
                            {"description": "Amount $4,100.00\nDLN AB12345"},
                            {"description": "Amount"}
                        ]
                    }]
                }));
            })
            .await;

        let text = client_for(&server).extract_text(b"image").await.unwrap();

        mock.assert_async().await;
        assert_eq!(text, "Amount $4,100.00\nDLN AB12345");
    }

    #[tokio::test]
    async fn service_reported_error_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({
                    "responses": [{"error": {"code": 3, "message": "Bad image data."}}]
                }));
            })
            .await;

        let err = client_for(&server).extract_text(b"junk").await.unwrap_err();
        assert_matches!(err, OcrError::Service(msg) if msg == "Bad image data.");
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(403).body("API key not valid");
            })
            .await;

        let err = client_for(&server).extract_text(b"image").await.unwrap_err();
        assert_matches!(err, OcrError::ApiError { status: 403, body } if body == "API key not valid");
    }

    #[tokio::test]
    async fn service_account_requests_carry_bearer_token() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200)
                    .json_body(json!({"access_token": "tok1", "expires_in": 3600}));
            })
            .await;
        let vision_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .header("Authorization", "Bearer tok1");
                then.status(200).json_body(json!({
                    "responses": [{"textAnnotations": [{"description": "DLN AB12345"}]}]
                }));
            })
            .await;

        let client = VisionClient::new(VisionConfig {
            endpoint: server.url(PATH),
            auth: VisionAuth::ServiceAccount(crate::credentials::test_key(server.url("/token"))),
            timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(client.extract_text(b"one").await.unwrap(), "DLN AB12345");
        assert_eq!(client.extract_text(b"two").await.unwrap(), "DLN AB12345");

        token_mock.assert_hits_async(1).await;
        vision_mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn unconfigured_extractor_always_fails() {
        let err = crate::UnconfiguredExtractor
            .extract_text(b"image")
            .await
            .unwrap_err();
        assert_matches!(err, OcrError::NotConfigured);
    }
}
