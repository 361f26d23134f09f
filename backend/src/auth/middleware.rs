use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::AppState;

/// Header carrying the shared upload secret.
pub const UPLOAD_SECRET_HEADER: &str = "x-upload-secret";

/// Runs before any write path: uploads, upserts and snapshot saves all sit
/// behind this check, so a rejected caller never touches storage.
pub async fn require_upload_secret(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into());

    if let Err(retry_after) = state.rate_limiter.check(&client).await {
        let secs = retry_after.as_secs().max(1);
        tracing::warn!(client = %client, retry_after_secs = secs, "Upload secret attempts exhausted");
        return Err(AppError::RateLimited(secs));
    }

    let presented = req
        .headers()
        .get(UPLOAD_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.gate.check(presented) {
        Ok(()) => {
            state.rate_limiter.clear(&client).await;
            Ok(next.run(req).await)
        }
        Err(e) => {
            state.rate_limiter.record_failure(&client).await;
            tracing::warn!(
                client = %client,
                path = %req.uri().path(),
                presented = presented.is_some(),
                "Upload secret rejected"
            );
            Err(e)
        }
    }
}
