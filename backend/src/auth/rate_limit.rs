use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// Failed secret attempts allowed per window before a client is blocked
const MAX_FAILURES: u32 = 5;
const WINDOW_SECS: u64 = 60;

/// In-memory failure counter per client (single-instance deployments)
#[derive(Clone, Default)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, FailureEntry>>>,
}

struct FailureEntry {
    failures: u32,
    window_start: Instant,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Err(retry_after) while `key` has used up its failures for the window.
    pub async fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_with_limits(key, MAX_FAILURES, WINDOW_SECS).await
    }

    pub async fn check_with_limits(
        &self,
        key: &str,
        max_failures: u32,
        window_secs: u64,
    ) -> Result<(), Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);

        let Some((failures, elapsed)) = entries
            .get(key)
            .map(|e| (e.failures, now.duration_since(e.window_start)))
        else {
            return Ok(());
        };
        if elapsed > window {
            entries.remove(key);
            return Ok(());
        }
        if failures >= max_failures {
            return Err(window.saturating_sub(elapsed));
        }
        Ok(())
    }

    pub async fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(WINDOW_SECS);

        let entry = entries.entry(key.to_string()).or_insert(FailureEntry {
            failures: 0,
            window_start: now,
        });
        if now.duration_since(entry.window_start) > window {
            entry.failures = 0;
            entry.window_start = now;
        }
        entry.failures += 1;
    }

    pub async fn clear(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Drop expired entries (called from a background task)
    pub async fn cleanup(&self) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(WINDOW_SECS * 2);

        entries.retain(|_, entry| now.duration_since(entry.window_start) < window);
    }

    /// Runs `cleanup` every five minutes for the life of the process.
    pub fn spawn_cleanup_worker(&self) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }
}
