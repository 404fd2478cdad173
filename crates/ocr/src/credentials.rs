//! Authentication for the Vision API.
//!
//! Two modes are supported: a plain API key sent as the `key` query
//! parameter, or a service-account JSON key. Service-account keys sign an
//! RS256 JWT assertion which is exchanged at the key's `token_uri` for a
//! short-lived bearer token.

use std::fmt;
use std::path::Path;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::OcrError;

/// OAuth scope granting access to the Vision API.
pub const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";

/// Token endpoint used when the key file omits `token_uri`.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Grant type for the JWT-bearer token exchange.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A cached token is refreshed this long before it expires.
const REFRESH_MARGIN_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// Key material
// ---------------------------------------------------------------------------

/// The fields of a Google service-account key file that token exchange needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, OcrError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, OcrError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Sign an assertion valid from `issued_at` for one hour.
    pub fn sign_assertion(&self, issued_at: i64) -> Result<String, OcrError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: VISION_SCOPE,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// How requests to the Vision API are authorised.
#[derive(Clone)]
pub enum VisionAuth {
    ApiKey(String),
    ServiceAccount(ServiceAccountKey),
}

impl fmt::Debug for VisionAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Token exchange
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Exchanges service-account assertions for bearer tokens, reusing a
/// token until shortly before it expires.
pub struct TokenSource {
    key: ServiceAccountKey,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, fetching a new one when needed.
    pub async fn access_token(&self, client: &reqwest::Client) -> Result<String, OcrError> {
        let now = chrono::Utc::now().timestamp();
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at - REFRESH_MARGIN_SECS > now {
                return Ok(token.token.clone());
            }
        }

        let assertion = self.key.sign_assertion(now)?;
        let response = client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

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

        let token: TokenResponse = response.json().await?;
        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "Fetched OCR access token"
        );

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            token: token.access_token,
            expires_at: now + token.expires_in,
        });
        Ok(access_token)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// A service-account key with a real RSA key, exchanging at `token_uri`.
#[cfg(test)]
pub(crate) fn test_key(token_uri: String) -> ServiceAccountKey {
    ServiceAccountKey {
        client_email: "ocr@intake-test.iam.gserviceaccount.com".to_string(),
        private_key: include_str!("../testdata/service_account.pem").to_string(),
        token_uri,
    }
}
