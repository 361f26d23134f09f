use axum::{
    extract::{Path, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
};

use crate::blob::{content_type_for, BlobError};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Serves stored objects back when blobs live on local disk, so evidence
/// URLs resolve without a separate file server.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let bytes = match state.blob.download(&name).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) | Err(BlobError::InvalidName(_)) => {
            return Err(AppError::NotFound(format!("no file named {}", name)))
        }
        Err(e) => return Err(AppError::StorageRead(e.to_string())),
    };

    Ok((
        [
            (CONTENT_TYPE, content_type_for(&name)),
            (CACHE_CONTROL, "no-cache"),
        ],
        bytes,
    ))
}
