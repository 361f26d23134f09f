use std::{env, fmt, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    Gcs,
    Local,
}

impl FromStr for BlobBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gcs" => Ok(Self::Gcs),
            "local" => Ok(Self::Local),
            other => Err(anyhow!("BLOB_BACKEND must be gcs or local, got {:?}", other)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    /// Extra CORS origins, e.g. a LAN address used during development.
    pub cors_extra_origins: Vec<String>,

    pub blob_backend: BlobBackend,
    pub gcs_bucket: String,
    pub gcs_public_base_url: String,
    pub gcs_access_token: Option<String>,
    pub gcp_credentials_json: Option<String>,
    pub google_application_credentials: Option<PathBuf>,
    pub local_blob_dir: PathBuf,
    pub local_public_base_url: String,

    pub upload_secret: String,
    pub max_upload_bytes: usize,
}

// Secrets stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("frontend_url", &self.frontend_url)
            .field("cors_extra_origins", &self.cors_extra_origins)
            .field("blob_backend", &self.blob_backend)
            .field("gcs_bucket", &self.gcs_bucket)
            .field("gcs_public_base_url", &self.gcs_public_base_url)
            .field("gcs_access_token", &self.gcs_access_token.as_ref().map(|_| "<redacted>"))
            .field("gcp_credentials_json", &self.gcp_credentials_json.as_ref().map(|_| "<redacted>"))
            .field("google_application_credentials", &self.google_application_credentials)
            .field("local_blob_dir", &self.local_blob_dir)
            .field("local_public_base_url", &self.local_public_base_url)
            .field("upload_secret", &"<redacted>")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: or("HOST", "0.0.0.0"),
            port: or("PORT", "8080")
                .parse()
                .context("PORT must be a number")?,
            frontend_url: or("FRONTEND_URL", "http://localhost:3000"),
            cors_extra_origins: var("CORS_EXTRA_ORIGINS")
                .map(|extra| {
                    extra
                        .split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),

            blob_backend: or("BLOB_BACKEND", "gcs").parse()?,
            gcs_bucket: or("GCS_BUCKET", "internet_health"),
            gcs_public_base_url: or("GCS_PUBLIC_BASE_URL", "https://storage.googleapis.com"),
            gcs_access_token: var("GCS_ACCESS_TOKEN"),
            gcp_credentials_json: var("GCP_CREDENTIALS"),
            google_application_credentials: var("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
            local_blob_dir: PathBuf::from(or("LOCAL_BLOB_DIR", "./data")),
            local_public_base_url: or("LOCAL_PUBLIC_BASE_URL", "http://localhost:8080/files"),

            upload_secret: var("UPLOAD_SECRET").context("UPLOAD_SECRET must be set")?,
            max_upload_bytes: or("MAX_UPLOAD_BYTES", "20971520")
                .parse()
                .context("MAX_UPLOAD_BYTES must be a number")?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Frontend origin first, then any extras.
    pub fn allowed_origins(&self) -> Vec<&str> {
        std::iter::once(self.frontend_url.as_str())
            .chain(self.cors_extra_origins.iter().map(String::as_str))
            .collect()
    }
}
