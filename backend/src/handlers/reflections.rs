use axum::{extract::State, Json};
use chrono::Local;

use crate::dto::{ReflectionListResponse, SubmitReflectionRequest, SubmitReflectionResponse};
use crate::error::AppResult;
use crate::services::submission;
use crate::AppState;

pub async fn submit_reflection(
    State(state): State<AppState>,
    Json(body): Json<SubmitReflectionRequest>,
) -> AppResult<Json<SubmitReflectionResponse>> {
    let incoming = body.into_submission(Local::now().date_naive())?;
    let outcome = submission::submit_reflection(&state.records, incoming).await?;
    Ok(Json(SubmitReflectionResponse::new(
        outcome.reflection,
        outcome.replaced,
    )))
}

pub async fn list_reflections(
    State(state): State<AppState>,
) -> AppResult<Json<ReflectionListResponse>> {
    let loaded = state.records.load_weekly_reflections().await;
    let warning = loaded.warning();
    let mut reflections = loaded.records;
    reflections.sort_by_key(|r| r.week_start);
    Ok(Json(ReflectionListResponse {
        reflections,
        warning,
    }))
}
