//! Blob storage for evidence photos and CSV snapshots.
//!
//! Stores are opaque name -> bytes maps with a public URL per object.
//! `gcs` talks to Google Cloud Storage, `local` to a directory on disk.

pub mod gcs;
pub mod gcs_auth;
pub mod local;
#[cfg(test)]
pub mod memory;

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::daily_record::EvidenceCategory;

/// Extensions accepted for evidence uploads (compared case-insensitively).
pub const EVIDENCE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob store unreachable: {0}")]
    Unreachable(String),

    #[error("blob store refused {operation} of {name} (status {status})")]
    Denied {
        operation: &'static str,
        name: String,
        status: u16,
    },

    #[error("invalid object name: {0}")]
    InvalidName(String),

    #[error("object {0} is not UTF-8 text")]
    NotText(String),

    #[error("credentials unusable: {0}")]
    Credentials(String),

    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `name`, replacing any existing object, and return
    /// the object's public URL.
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, BlobError>;

    /// Fetch an object. `Ok(None)` means no object exists under `name`.
    async fn download(&self, name: &str) -> Result<Option<Vec<u8>>, BlobError>;

    fn public_url(&self, name: &str) -> String;

    async fn download_text(&self, name: &str) -> Result<Option<String>, BlobError> {
        match self.download(name).await? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| BlobError::NotText(name.to_owned())),
        }
    }

    async fn upload_text(&self, name: &str, text: &str) -> Result<(), BlobError> {
        self.upload(name, text.as_bytes().to_vec(), CSV_CONTENT_TYPE)
            .await
            .map(|_| ())
    }
}

/// `{YYYYMMDD}_{category}_{token}{ext}`, keeping the source extension.
pub fn evidence_object_name(
    date: NaiveDate,
    category: EvidenceCategory,
    original_filename: &str,
) -> String {
    format!(
        "{}_{}_{}{}",
        date.format("%Y%m%d"),
        category.as_str(),
        Uuid::new_v4().simple(),
        extension_of(original_filename)
    )
}

/// `.ext` including the dot, or empty when the name has none.
fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

pub fn is_allowed_evidence(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| EVIDENCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("csv") => CSV_CONTENT_TYPE,
        _ => "application/octet-stream",
    }
}

/// Object names are single path segments; reject anything that could
/// escape a directory or address a different object.
pub fn validate_object_name(name: &str) -> Result<(), BlobError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(BlobError::InvalidName(name.to_owned()));
    }
    Ok(())
}
