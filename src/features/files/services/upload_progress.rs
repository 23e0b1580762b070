//! Per-upload progress, keyed by owner and a client supplied upload id.
//!
//! Byte transfer fills 0..=90; the remaining stages are fixed marks.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use utoipa::ToSchema;
use uuid::Uuid;

const TRANSFER_CEILING: u8 = 90;

/// How long an entry survives without any change
const RETENTION_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UploadStage {
    Transferring,
    /// Object storage accepted the bytes
    Processing,
    /// Writing the file record
    Saving,
    Complete,
    Failed,
}

impl UploadStage {
    fn percent(&self) -> Option<u8> {
        match self {
            UploadStage::Transferring | UploadStage::Failed => None,
            UploadStage::Processing => Some(95),
            UploadStage::Saving => Some(98),
            UploadStage::Complete => Some(100),
        }
    }

    fn is_finished(&self) -> bool {
        matches!(self, UploadStage::Complete | UploadStage::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UploadProgress {
    pub stage: UploadStage,
    pub percent: u8,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Transfer percentage: round(loaded / total * 90)
pub fn transfer_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let ratio = (loaded.min(total) as f64) / (total as f64);
    (ratio * TRANSFER_CEILING as f64).round() as u8
}

type UploadKey = (Uuid, String);

/// Progress of in-flight and recently finished uploads, scoped per owner
#[derive(Default)]
pub struct UploadProgressTracker {
    uploads: Mutex<HashMap<UploadKey, UploadProgress>>,
}

impl UploadProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new upload at 0%. Entries of any stage that have not
    /// changed within the retention window are dropped.
    pub fn start(&self, owner_id: Uuid, upload_id: &str, file_name: &str) {
        let now = Utc::now();
        let Ok(mut uploads) = self.uploads.lock() else {
            return;
        };
        evict_stale(&mut uploads, now);
        uploads.insert(
            (owner_id, upload_id.to_string()),
            UploadProgress {
                stage: UploadStage::Transferring,
                percent: 0,
                file_name: file_name.to_string(),
                error: None,
                updated_at: now,
            },
        );
    }

    /// Record transferred bytes. Progress never moves backwards and only
    /// changes while transferring.
    pub fn report_transfer(&self, owner_id: Uuid, upload_id: &str, loaded: u64, total: u64) {
        let percent = transfer_percent(loaded, total);
        self.update(owner_id, upload_id, |p| {
            if p.stage == UploadStage::Transferring && percent > p.percent {
                p.percent = percent;
                true
            } else {
                false
            }
        });
    }

    pub fn advance(&self, owner_id: Uuid, upload_id: &str, stage: UploadStage) {
        let Some(percent) = stage.percent() else {
            return;
        };
        self.update(owner_id, upload_id, |p| {
            if p.stage.is_finished() || percent < p.percent {
                return false;
            }
            p.stage = stage;
            p.percent = percent;
            true
        });
    }

    pub fn fail(&self, owner_id: Uuid, upload_id: &str, error: &str) {
        self.update(owner_id, upload_id, |p| {
            if p.stage == UploadStage::Complete {
                return false;
            }
            p.stage = UploadStage::Failed;
            p.error = Some(error.to_string());
            true
        });
    }

    /// Progress of `owner_id`'s upload; other users' uploads are invisible
    pub fn get(&self, owner_id: Uuid, upload_id: &str) -> Option<UploadProgress> {
        self.uploads
            .lock()
            .ok()?
            .get(&(owner_id, upload_id.to_string()))
            .cloned()
    }

    fn update(
        &self,
        owner_id: Uuid,
        upload_id: &str,
        apply: impl FnOnce(&mut UploadProgress) -> bool,
    ) {
        let Ok(mut uploads) = self.uploads.lock() else {
            return;
        };
        if let Some(progress) = uploads.get_mut(&(owner_id, upload_id.to_string())) {
            if apply(progress) {
                progress.updated_at = Utc::now();
            }
        }
    }
}

fn evict_stale(uploads: &mut HashMap<UploadKey, UploadProgress>, now: DateTime<Utc>) {
    uploads.retain(|_, p| now - p.updated_at <= Duration::minutes(RETENTION_MINUTES));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_percent() {
        assert_eq!(transfer_percent(0, 100), 0);
        assert_eq!(transfer_percent(50, 100), 45);
        assert_eq!(transfer_percent(100, 100), 90);
        assert_eq!(transfer_percent(1, 3), 30);
        assert_eq!(transfer_percent(10, 0), 0);
        assert_eq!(transfer_percent(200, 100), 90);
    }

    #[test]
    fn test_full_lifecycle() {
        let tracker = UploadProgressTracker::new();
        let me = Uuid::new_v4();
        tracker.start(me, "u1", "report.pdf");
        tracker.report_transfer(me, "u1", 250_000, 500_000);
        assert_eq!(tracker.get(me, "u1").unwrap().percent, 45);

        tracker.advance(me, "u1", UploadStage::Processing);
        assert_eq!(tracker.get(me, "u1").unwrap().percent, 95);
        tracker.advance(me, "u1", UploadStage::Saving);
        assert_eq!(tracker.get(me, "u1").unwrap().percent, 98);
        tracker.advance(me, "u1", UploadStage::Complete);

        let done = tracker.get(me, "u1").unwrap();
        assert_eq!(done.stage, UploadStage::Complete);
        assert_eq!(done.percent, 100);
        assert_eq!(done.file_name, "report.pdf");
    }

    #[test]
    fn test_transfer_progress_is_monotonic() {
        let tracker = UploadProgressTracker::new();
        let me = Uuid::new_v4();
        tracker.start(me, "u1", "a.txt");
        tracker.report_transfer(me, "u1", 80, 100);
        tracker.report_transfer(me, "u1", 40, 100);
        assert_eq!(tracker.get(me, "u1").unwrap().percent, 72);
    }

    #[test]
    fn test_transfer_ignored_after_processing() {
        let tracker = UploadProgressTracker::new();
        let me = Uuid::new_v4();
        tracker.start(me, "u1", "a.txt");
        tracker.advance(me, "u1", UploadStage::Processing);
        tracker.report_transfer(me, "u1", 100, 100);
        assert_eq!(tracker.get(me, "u1").unwrap().percent, 95);
    }

    #[test]
    fn test_failure_keeps_last_percent() {
        let tracker = UploadProgressTracker::new();
        let me = Uuid::new_v4();
        tracker.start(me, "u1", "a.txt");
        tracker.report_transfer(me, "u1", 50, 100);
        tracker.fail(me, "u1", "storage unavailable");

        let failed = tracker.get(me, "u1").unwrap();
        assert_eq!(failed.stage, UploadStage::Failed);
        assert_eq!(failed.percent, 45);
        assert_eq!(failed.error.as_deref(), Some("storage unavailable"));

        tracker.advance(me, "u1", UploadStage::Complete);
        assert_eq!(tracker.get(me, "u1").unwrap().stage, UploadStage::Failed);
    }

    #[test]
    fn test_unknown_upload() {
        let tracker = UploadProgressTracker::new();
        let me = Uuid::new_v4();
        tracker.report_transfer(me, "missing", 1, 2);
        assert!(tracker.get(me, "missing").is_none());
    }

    #[test]
    fn test_uploads_are_scoped_to_owner() {
        let tracker = UploadProgressTracker::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        tracker.start(alice, "u1", "alice.pdf");
        tracker.start(bob, "u1", "bob.pdf");
        tracker.report_transfer(bob, "u1", 100, 100);

        let own = tracker.get(alice, "u1").unwrap();
        assert_eq!(own.file_name, "alice.pdf");
        assert_eq!(own.percent, 0);
        assert!(tracker.get(Uuid::new_v4(), "u1").is_none());
    }

    #[test]
    fn test_abandoned_transfers_are_evicted() {
        let tracker = UploadProgressTracker::new();
        let me = Uuid::new_v4();
        tracker.start(me, "abandoned", "a.txt");
        tracker.report_transfer(me, "abandoned", 10, 100);
        tracker.start(me, "done", "b.txt");
        tracker.advance(me, "done", UploadStage::Complete);

        let later = Utc::now() + Duration::minutes(RETENTION_MINUTES + 1);
        let mut uploads = tracker.uploads.lock().unwrap();
        evict_stale(&mut uploads, later);

        assert!(uploads.is_empty());
    }

    #[test]
    fn test_recent_entries_survive_eviction() {
        let tracker = UploadProgressTracker::new();
        let me = Uuid::new_v4();
        tracker.start(me, "active", "a.txt");

        let mut uploads = tracker.uploads.lock().unwrap();
        evict_stale(&mut uploads, Utc::now());

        assert_eq!(uploads.len(), 1);
    }
}
