use chrono::NaiveDate;
use futures_util::future::join_all;

use crate::blob::{content_type_for, evidence_object_name, BlobError, BlobStore};
use crate::error::{AppError, AppResult};
use crate::models::daily_record::{DailyRecord, EvidenceCategory};
use crate::models::reflection::{ReflectionSubmission, WeeklyReflection};
use crate::services::calendar::week_start;
use crate::services::upsert::{upsert_daily, upsert_reflection};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct EvidenceFile {
    pub category: EvidenceCategory,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A validated daily form: the record without evidence URLs, plus files.
#[derive(Debug, Clone)]
pub struct DailySubmission {
    pub record: DailyRecord,
    pub evidence: Vec<EvidenceFile>,
}

#[derive(Debug, Clone)]
pub struct DailyOutcome {
    pub record: DailyRecord,
    pub replaced: bool,
    pub uploaded: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReflectionOutcome {
    pub reflection: WeeklyReflection,
    pub replaced: bool,
}

struct UploadedEvidence {
    category: EvidenceCategory,
    object: String,
    url: String,
}

async fn upload_evidence(
    blob: &dyn BlobStore,
    date: NaiveDate,
    file: EvidenceFile,
) -> Result<UploadedEvidence, (String, BlobError)> {
    let object = evidence_object_name(date, file.category, &file.filename);
    match blob
        .upload(&object, file.bytes, content_type_for(&file.filename))
        .await
    {
        Ok(url) => Ok(UploadedEvidence {
            category: file.category,
            object,
            url,
        }),
        Err(e) => Err((object, e)),
    }
}

/// Uploaded objects that no saved record points at. Not retried; logged so
/// they can be cleaned up by hand.
fn log_orphans(uploaded: &[UploadedEvidence], reason: &str) {
    if uploaded.is_empty() {
        return;
    }
    let objects: Vec<&str> = uploaded.iter().map(|u| u.object.as_str()).collect();
    tracing::warn!(
        orphaned = ?objects,
        reason,
        "Submission aborted after evidence upload; objects need manual cleanup"
    );
}

/// Upload evidence, then load, upsert and save the daily snapshot.
///
/// Uploads run concurrently and each one completes or fails on its own.
/// The submission counts as committed only once the snapshot save
/// succeeds; on any later failure the uploaded objects are left in place
/// and logged.
pub async fn submit_daily(
    blob: &dyn BlobStore,
    store: &RecordStore,
    submission: DailySubmission,
) -> AppResult<DailyOutcome> {
    let DailySubmission { mut record, evidence } = submission;
    let date = record.date;

    let results = join_all(
        evidence
            .into_iter()
            .map(|file| upload_evidence(blob, date, file)),
    )
    .await;

    let mut uploaded = Vec::new();
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(u) => uploaded.push(u),
            Err((object, e)) => {
                tracing::error!(object = %object, error = %e, "Evidence upload failed");
                failed.push(format!("{}: {}", object, e));
            }
        }
    }
    if !failed.is_empty() {
        log_orphans(&uploaded, "sibling evidence upload failed");
        return Err(AppError::StorageWrite(format!(
            "{} evidence upload(s) failed: {}",
            failed.len(),
            failed.join("; ")
        )));
    }

    for u in &uploaded {
        record.set_evidence_url(u.category, u.url.clone());
    }

    let existing = match store.load_daily_records().await.into_result() {
        Ok(records) => records,
        Err(e) => {
            log_orphans(&uploaded, "daily snapshot unreadable");
            return Err(e.into());
        }
    };

    let upserted = upsert_daily(&existing, record.clone());
    if let Err(e) = store.save_daily_records(&upserted.records).await {
        log_orphans(&uploaded, "daily snapshot save failed");
        return Err(e.into());
    }

    tracing::info!(
        date = %date,
        replaced = upserted.replaced,
        evidence = uploaded.len(),
        total = upserted.records.len(),
        "Daily record saved"
    );

    Ok(DailyOutcome {
        record,
        replaced: upserted.replaced,
        uploaded: uploaded.into_iter().map(|u| u.object).collect(),
    })
}

/// Load, upsert and save the reflection snapshot.
pub async fn submit_reflection(
    store: &RecordStore,
    submission: ReflectionSubmission,
) -> AppResult<ReflectionOutcome> {
    let week = week_start(submission.date);
    let existing = store.load_weekly_reflections().await.into_result()?;

    let upserted = upsert_reflection(&existing, submission);
    store.save_weekly_reflections(&upserted.records).await?;

    let reflection = upserted
        .records
        .iter()
        .find(|r| week_start(r.week_start) == week)
        .cloned()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("reflection for {} missing after upsert", week)))?;

    tracing::info!(week_start = %week, replaced = upserted.replaced, "Weekly reflection saved");

    Ok(ReflectionOutcome {
        reflection,
        replaced: upserted.replaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::memory::MemoryBlobStore;
    use crate::store::{DAILY_SNAPSHOT, REFLECTION_SNAPSHOT};
    use std::sync::Arc;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn setup() -> (Arc<MemoryBlobStore>, RecordStore) {
        let blob = Arc::new(MemoryBlobStore::new());
        (blob.clone(), RecordStore::new(blob))
    }

    fn photo(category: EvidenceCategory) -> EvidenceFile {
        EvidenceFile {
            category,
            filename: "pic.png".into(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[tokio::test]
    async fn evidence_urls_land_on_the_record() {
        let (blob, store) = setup();
        let submission = DailySubmission {
            record: DailyRecord {
                steps: Some(5000),
                ..DailyRecord::blank(date(10))
            },
            evidence: vec![photo(EvidenceCategory::Steps), photo(EvidenceCategory::Lunch)],
        };

        let out = submit_daily(blob.as_ref(), &store, submission).await.unwrap();
        assert!(!out.replaced);
        assert_eq!(out.uploaded.len(), 2);
        assert!(out.record.steps_evidence_url.starts_with("memory://bucket/20240610_steps_"));
        assert!(out.record.lunch_url.starts_with("memory://bucket/20240610_lunch_"));
        assert!(out.record.lunch_url.ends_with(".png"));

        let stored = store.load_daily_records().await.into_result().unwrap();
        assert_eq!(stored, vec![out.record.clone()]);
        assert_eq!(blob.names().await.len(), 3);
    }

    #[tokio::test]
    async fn resubmission_overwrites_whole_record() {
        let (blob, store) = setup();
        let first = DailySubmission {
            record: DailyRecord {
                steps: Some(5000),
                sleep_hours: Some(7.0),
                dinner_desc: "curry".into(),
                ..DailyRecord::blank(date(10))
            },
            evidence: vec![photo(EvidenceCategory::Sleep)],
        };
        submit_daily(blob.as_ref(), &store, first).await.unwrap();

        let second = DailySubmission {
            record: DailyRecord {
                steps: Some(8000),
                ..DailyRecord::blank(date(10))
            },
            evidence: vec![],
        };
        let out = submit_daily(blob.as_ref(), &store, second).await.unwrap();
        assert!(out.replaced);

        let stored = store.load_daily_records().await.into_result().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].steps, Some(8000));
        assert_eq!(stored[0].sleep_hours, None);
        assert!(stored[0].dinner_desc.is_empty());
        assert!(stored[0].sleep_evidence_url.is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_prior_snapshot_and_reports_write_error() {
        let (blob, store) = setup();
        store
            .save_daily_records(&[DailyRecord::blank(date(9))])
            .await
            .unwrap();
        blob.deny_writes_to(DAILY_SNAPSHOT);

        let submission = DailySubmission {
            record: DailyRecord::blank(date(10)),
            evidence: vec![photo(EvidenceCategory::Screen)],
        };
        let err = submit_daily(blob.as_ref(), &store, submission).await.unwrap_err();
        assert!(matches!(err, AppError::StorageWrite(_)));

        let stored = store.load_daily_records().await.into_result().unwrap();
        assert_eq!(stored, vec![DailyRecord::blank(date(9))]);
        // The screen photo stays behind as an orphan.
        assert!(blob
            .names()
            .await
            .iter()
            .any(|n| n.starts_with("20240610_screen_")));
    }

    #[tokio::test]
    async fn failed_upload_aborts_before_touching_snapshot() {
        let (blob, store) = setup();
        blob.deny_writes_to("20240610_dinner_");

        let submission = DailySubmission {
            record: DailyRecord::blank(date(10)),
            evidence: vec![photo(EvidenceCategory::Dinner), photo(EvidenceCategory::Breakfast)],
        };
        let err = submit_daily(blob.as_ref(), &store, submission).await.unwrap_err();
        assert!(matches!(err, AppError::StorageWrite(_)));

        let names = blob.names().await;
        assert!(!names.contains(&DAILY_SNAPSHOT.to_string()));
        // The sibling upload still completed.
        assert!(names.iter().any(|n| n.starts_with("20240610_breakfast_")));
    }

    #[tokio::test]
    async fn unreadable_snapshot_blocks_the_write() {
        let (blob, store) = setup();
        blob.put_text(DAILY_SNAPSHOT, "date\nnonsense\n").await;

        let submission = DailySubmission {
            record: DailyRecord::blank(date(10)),
            evidence: vec![],
        };
        let err = submit_daily(blob.as_ref(), &store, submission).await.unwrap_err();
        assert!(matches!(err, AppError::StorageRead(_)));
        assert_eq!(
            blob.download_text(DAILY_SNAPSHOT).await.unwrap().as_deref(),
            Some("date\nnonsense\n")
        );
    }

    #[tokio::test]
    async fn reflection_for_same_week_updates_single_entry() {
        let (blob, store) = setup();
        let first = submit_reflection(
            &store,
            ReflectionSubmission {
                date: date(12),
                reflection: "midweek".into(),
            },
        )
        .await
        .unwrap();
        assert!(!first.replaced);
        assert_eq!(first.reflection.week_start, date(10));

        let second = submit_reflection(
            &store,
            ReflectionSubmission {
                date: date(14),
                reflection: "friday".into(),
            },
        )
        .await
        .unwrap();
        assert!(second.replaced);
        assert_eq!(second.reflection.reflection, "friday");

        let stored = store.load_weekly_reflections().await.into_result().unwrap();
        assert_eq!(stored.len(), 1);
        let text = blob.download_text(REFLECTION_SNAPSHOT).await.unwrap().unwrap();
        assert!(text.starts_with("date,reflection"));
        assert!(text.contains("2024-06-10 00:00:00,friday"));
    }
}
