pub mod snapshot;

use std::sync::Arc;

use crate::blob::BlobStore;
use crate::models::daily_record::DailyRecord;
use crate::models::reflection::WeeklyReflection;

pub const DAILY_SNAPSHOT: &str = "daily_records.csv";
pub const REFLECTION_SNAPSHOT: &str = "reflection_records.csv";

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {snapshot}: {reason}")]
    Read {
        snapshot: &'static str,
        reason: String,
    },

    #[error("could not write {snapshot}: {reason}")]
    Write {
        snapshot: &'static str,
        reason: String,
    },
}

/// A loaded collection. A missing snapshot loads as empty with no error;
/// an unreadable one loads as empty with the error attached, so callers
/// can show what they have without pretending nothing went wrong.
#[derive(Debug)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub error: Option<StoreError>,
}

impl<T> Loaded<T> {
    fn ok(records: Vec<T>) -> Self {
        Self {
            records,
            error: None,
        }
    }

    fn failed(error: StoreError) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error),
        }
    }

    /// For write paths, where an unreadable snapshot must not be replaced.
    pub fn into_result(self) -> Result<Vec<T>, StoreError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.records),
        }
    }

    pub fn warning(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

/// Full-collection snapshots of daily records and weekly reflections.
///
/// Every save rewrites the whole object. There is no locking: two
/// submissions that interleave load and save lose the earlier writer's
/// change.
#[derive(Clone)]
pub struct RecordStore {
    blob: Arc<dyn BlobStore>,
}

impl RecordStore {
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self { blob }
    }

    pub async fn load_daily_records(&self) -> Loaded<DailyRecord> {
        self.load(DAILY_SNAPSHOT, snapshot::decode_daily).await
    }

    pub async fn save_daily_records(&self, records: &[DailyRecord]) -> Result<(), StoreError> {
        let text = snapshot::encode_daily(records).map_err(|e| StoreError::Write {
            snapshot: DAILY_SNAPSHOT,
            reason: e.to_string(),
        })?;
        self.save(DAILY_SNAPSHOT, &text, records.len()).await
    }

    pub async fn load_weekly_reflections(&self) -> Loaded<WeeklyReflection> {
        self.load(REFLECTION_SNAPSHOT, snapshot::decode_reflections)
            .await
    }

    pub async fn save_weekly_reflections(
        &self,
        reflections: &[WeeklyReflection],
    ) -> Result<(), StoreError> {
        let text = snapshot::encode_reflections(reflections).map_err(|e| StoreError::Write {
            snapshot: REFLECTION_SNAPSHOT,
            reason: e.to_string(),
        })?;
        self.save(REFLECTION_SNAPSHOT, &text, reflections.len())
            .await
    }

    async fn load<T>(
        &self,
        snapshot: &'static str,
        decode: fn(&str) -> Result<Vec<T>, snapshot::SnapshotError>,
    ) -> Loaded<T> {
        let text = match self.blob.download_text(snapshot).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!(snapshot, "Snapshot not found, starting empty");
                return Loaded::ok(Vec::new());
            }
            Err(e) => {
                tracing::error!(snapshot, error = %e, "Failed to fetch snapshot");
                return Loaded::failed(StoreError::Read {
                    snapshot,
                    reason: e.to_string(),
                });
            }
        };

        match decode(&text) {
            Ok(records) => {
                tracing::debug!(snapshot, count = records.len(), "Loaded snapshot");
                Loaded::ok(records)
            }
            Err(e) => {
                tracing::error!(snapshot, error = %e, "Snapshot is malformed");
                Loaded::failed(StoreError::Read {
                    snapshot,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn save(&self, snapshot: &'static str, text: &str, count: usize) -> Result<(), StoreError> {
        self.blob.upload_text(snapshot, text).await.map_err(|e| {
            tracing::error!(snapshot, error = %e, "Failed to write snapshot");
            StoreError::Write {
                snapshot,
                reason: e.to_string(),
            }
        })?;
        tracing::info!(snapshot, count, "Saved snapshot");
        Ok(())
    }
}
