use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::store::DAILY_SNAPSHOT;
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "habitlog-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Ready once the blob store answers. A missing snapshot still counts as
/// ready, that is the first-run state.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.blob.download_text(DAILY_SNAPSHOT).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": { "blob_store": "ok" },
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "checks": { "blob_store": "failed" },
                })),
            )
        }
    }
}
