use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use chrono::Local;

use crate::blob::is_allowed_evidence;
use crate::dto::{DailyRecordForm, DailyRecordListResponse, DailyRecordQuery, SubmitDailyResponse};
use crate::error::{AppError, AppResult};
use crate::models::daily_record::EvidenceCategory;
use crate::services::submission::{self, DailySubmission, EvidenceFile};
use crate::AppState;

fn multipart_error(err: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("invalid multipart payload: {}", err))
}

/// Drains the multipart body: `{category}_evidence` parts are files, every
/// other known name is a text field.
async fn read_form(mut multipart: Multipart) -> AppResult<DailySubmission> {
    let mut form = DailyRecordForm::default();
    let mut evidence = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(category) = EvidenceCategory::from_form_field(&name) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if bytes.is_empty() {
                continue;
            }
            if !is_allowed_evidence(&filename) {
                return Err(AppError::Validation(format!(
                    "{} must be a png, jpg or jpeg image, got {:?}",
                    name, filename
                )));
            }
            evidence.push(EvidenceFile {
                category,
                filename,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        if !form.set_field(&name, &value)? {
            tracing::debug!(field = %name, "Ignoring unknown form field");
        }
    }

    let record = form.into_record(Local::now().date_naive())?;
    Ok(DailySubmission { record, evidence })
}

pub async fn submit_daily_record(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<SubmitDailyResponse>> {
    let submission = read_form(multipart).await?;
    let outcome =
        submission::submit_daily(state.blob.as_ref(), &state.records, submission).await?;

    Ok(Json(SubmitDailyResponse {
        record: outcome.record,
        replaced: outcome.replaced,
        uploaded_evidence: outcome.uploaded,
    }))
}

pub async fn list_daily_records(
    State(state): State<AppState>,
    Query(query): Query<DailyRecordQuery>,
) -> AppResult<Json<DailyRecordListResponse>> {
    let (start, end) = query.bounds()?;
    let loaded = state.records.load_daily_records().await;
    let warning = loaded.warning();

    let mut records: Vec<_> = loaded
        .records
        .into_iter()
        .filter(|r| start.map_or(true, |s| r.date >= s) && end.map_or(true, |e| r.date <= e))
        .collect();
    records.sort_by_key(|r| r.date);

    Ok(Json(DailyRecordListResponse { records, warning }))
}
