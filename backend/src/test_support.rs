//! Router-level test helpers: an in-memory app state and request builders.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::Value;

use crate::auth::gate::SharedSecretGate;
use crate::auth::middleware::UPLOAD_SECRET_HEADER;
use crate::auth::rate_limit::RateLimitState;
use crate::blob::memory::MemoryBlobStore;
use crate::config::Config;
use crate::store::RecordStore;
use crate::AppState;

pub const SECRET: &str = "test-upload-secret";

const BOUNDARY: &str = "habitlog-test-boundary";

pub async fn test_state() -> (AppState, Arc<MemoryBlobStore>) {
    test_state_with(&[]).await
}

/// State backed by a fresh `MemoryBlobStore`, with extra config vars applied.
pub async fn test_state_with(vars: &[(&str, &str)]) -> (AppState, Arc<MemoryBlobStore>) {
    let mut env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env.insert("UPLOAD_SECRET".into(), SECRET.into());
    let config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();

    let blob = Arc::new(MemoryBlobStore::new());
    let state = AppState {
        config: Arc::new(config),
        blob: blob.clone(),
        records: RecordStore::new(blob.clone()),
        gate: Arc::new(SharedSecretGate::new(SECRET).unwrap()),
        rate_limiter: RateLimitState::new(),
    };
    (state, blob)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(uri: &str, secret: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(secret) = secret {
        builder = builder.header(UPLOAD_SECRET_HEADER, secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub enum FormPart<'a> {
    Text(&'a str, &'a str),
    /// Field name, file name, contents.
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_request(uri: &str, secret: Option<&str>, parts: &[FormPart]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::File(name, filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder().method("POST").uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(secret) = secret {
        builder = builder.header(UPLOAD_SECRET_HEADER, secret);
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn read_json(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
