use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::BlobError;
use crate::config::Config;

const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone)]
pub enum GcsCredentials {
    Anonymous,
    StaticToken(String),
    ServiceAccount(ServiceAccountKey),
}

impl GcsCredentials {
    /// Static token, then inline JSON, then the key file path.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if let Some(token) = &config.gcs_access_token {
            return Ok(Self::StaticToken(token.clone()));
        }
        if let Some(json) = &config.gcp_credentials_json {
            let key = serde_json::from_str(json)
                .map_err(|e| anyhow::anyhow!("GCP_CREDENTIALS is not a service-account key: {}", e))?;
            return Ok(Self::ServiceAccount(key));
        }
        if let Some(path) = &config.google_application_credentials {
            return Self::from_key_file(path);
        }
        Ok(Self::Anonymous)
    }

    fn from_key_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let key = serde_json::from_str(&raw).map_err(|e| {
            anyhow::anyhow!("{} is not a service-account key: {}", path.display(), e)
        })?;
        Ok(Self::ServiceAccount(key))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: String,
    refresh_after: DateTime<Utc>,
}

/// Produces bearer tokens for storage requests, caching exchanged tokens.
pub struct GcsAuth {
    credentials: GcsCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl GcsAuth {
    pub fn new(credentials: GcsCredentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// `None` for anonymous access.
    pub async fn bearer_token(
        &self,
        client: &reqwest::Client,
    ) -> Result<Option<String>, BlobError> {
        let key = match &self.credentials {
            GcsCredentials::Anonymous => return Ok(None),
            GcsCredentials::StaticToken(token) => return Ok(Some(token.clone())),
            GcsCredentials::ServiceAccount(key) => key,
        };

        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if now < token.refresh_after {
                return Ok(Some(token.access_token.clone()));
            }
        }

        let assertion = sign_assertion(key, now)?;
        let response = client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| BlobError::Unreachable(format!("token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BlobError::Credentials(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BlobError::Credentials(format!("bad token response: {}", e)))?;

        tracing::debug!(
            client_email = %key.client_email,
            expires_in = token.expires_in,
            "Obtained storage access token"
        );

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            refresh_after: now + Duration::seconds(token.expires_in - EXPIRY_MARGIN_SECS),
        });
        Ok(Some(access_token))
    }
}

/// RS256 JWT asserting the service account's identity to the token endpoint.
fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String, BlobError> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: STORAGE_SCOPE,
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ASSERTION_TTL_SECS)).timestamp(),
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| BlobError::Credentials(format!("invalid private key: {}", e)))?;
    encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
        .map_err(|e| BlobError::Credentials(format!("failed to sign assertion: {}", e)))
}
