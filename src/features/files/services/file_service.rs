use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::activities::models::ActivityType;
use crate::features::activities::ActivityService;
use crate::features::files::dtos::{FileListQuery, FileStatsDto};
use crate::features::files::models::FileRecord;
use crate::features::files::services::upload_progress::{UploadProgressTracker, UploadStage};
use crate::modules::change_feed::{ChangeEvent, ChangeFeed};
use crate::modules::storage::{object_key, ObjectStore};
use crate::shared::constants::RECENT_WINDOW_DAYS;
use crate::shared::format::{extension_of, file_type_tag, format_bytes, storage_percent};
use crate::shared::types::PaginationMeta;

/// Key, extension and type tag derived from an incoming file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub storage_key: String,
    pub extension: String,
    pub file_type: String,
}

pub fn plan_upload(prefix: &str, owner_id: Uuid, file_name: &str) -> UploadPlan {
    let extension = extension_of(file_name);
    UploadPlan {
        storage_key: object_key(
            prefix,
            &owner_id.to_string(),
            &Uuid::new_v4().to_string(),
            &extension,
        ),
        file_type: file_type_tag(&extension),
        extension,
    }
}

/// Whole days since upload is below the recent window
pub fn is_recent(uploaded_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - uploaded_at).num_days() < RECENT_WINDOW_DAYS
}

pub fn compute_stats(files: &[FileRecord], storage_quota: i64, now: DateTime<Utc>) -> FileStatsDto {
    let storage_used: i64 = files.iter().map(|f| f.size).sum();
    FileStatsDto {
        total_files: files.len() as i64,
        storage_used,
        storage_used_formatted: format_bytes(storage_used),
        storage_quota,
        storage_percent: storage_percent(storage_used, storage_quota),
        recent_uploads: files
            .iter()
            .filter(|f| is_recent(f.uploaded_at, now))
            .count() as i64,
    }
}

/// Service for file operations
pub struct FileService {
    pool: PgPool,
    store: Arc<dyn ObjectStore>,
    change_feed: ChangeFeed,
    progress: Arc<UploadProgressTracker>,
    storage_quota: i64,
}

impl FileService {
    pub fn new(
        pool: PgPool,
        store: Arc<dyn ObjectStore>,
        change_feed: ChangeFeed,
        progress: Arc<UploadProgressTracker>,
        storage_quota: i64,
    ) -> Self {
        Self {
            pool,
            store,
            change_feed,
            progress,
            storage_quota,
        }
    }

    pub fn progress(&self) -> &UploadProgressTracker {
        &self.progress
    }

    /// Store the bytes, then write the file record and its activity entry.
    ///
    /// The stored object is removed again when the record cannot be written.
    pub async fn upload(
        &self,
        owner_id: Uuid,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
        upload_id: Option<&str>,
    ) -> Result<FileRecord> {
        let result = self
            .store_and_record(owner_id, file_name, content_type, data, upload_id)
            .await;

        if let Some(id) = upload_id {
            match &result {
                Ok(_) => self.progress.advance(owner_id, id, UploadStage::Complete),
                Err(e) => self.progress.fail(owner_id, id, &e.public_message()),
            }
        }
        result
    }

    async fn store_and_record(
        &self,
        owner_id: Uuid,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
        upload_id: Option<&str>,
    ) -> Result<FileRecord> {
        let size = data.len() as i64;
        let plan = plan_upload(self.store.files_prefix(), owner_id, file_name);

        let stored = self
            .store
            .upload(&plan.storage_key, data, content_type)
            .await?;
        debug!("File stored: {}", stored.key);

        if let Some(id) = upload_id {
            self.progress.advance(owner_id, id, UploadStage::Processing);
            self.progress.advance(owner_id, id, UploadStage::Saving);
        }

        let record = match self
            .insert_record(owner_id, file_name, size, &plan, &stored.url)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to save file record, removing stored object: {}", e);
                if let Err(cleanup) = self.store.delete(&stored.key).await {
                    warn!("Orphaned object {}: {}", stored.key, cleanup);
                }
                return Err(e);
            }
        };

        info!(
            "File uploaded: id={}, owner={}, type={}, size={}",
            record.id, owner_id, record.file_type, record.size
        );
        self.change_feed
            .publish(ChangeEvent::FilesChanged { owner_id });
        self.change_feed
            .publish(ChangeEvent::ActivityRecorded { user_id: owner_id });

        Ok(record)
    }

    async fn insert_record(
        &self,
        owner_id: Uuid,
        file_name: &str,
        size: i64,
        plan: &UploadPlan,
        url: &str,
    ) -> Result<FileRecord> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO files (owner_id, name, size, file_type, extension, url, storage_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(file_name)
        .bind(size)
        .bind(&plan.file_type)
        .bind(&plan.extension)
        .bind(url)
        .bind(&plan.storage_key)
        .fetch_one(&mut *tx)
        .await?;

        ActivityService::record(&mut *tx, owner_id, ActivityType::Upload, file_name).await?;
        tx.commit().await?;

        Ok(record)
    }

    /// All files of `owner_id`, newest first
    pub async fn list_files(&self, owner_id: Uuid) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE owner_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    pub async fn count(&self, owner_id: Uuid) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// One page of the owner's files matching `search`
    pub async fn list_page(
        &self,
        owner_id: Uuid,
        query: &FileListQuery,
    ) -> Result<(Vec<FileRecord>, PaginationMeta)> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM files
            WHERE owner_id = $1
              AND ($2::TEXT IS NULL OR POSITION(LOWER($2) IN LOWER(name)) > 0)
            "#,
        )
        .bind(owner_id)
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        let meta = PaginationMeta::resolve(&query.pagination(), total);

        let files = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT * FROM files
            WHERE owner_id = $1
              AND ($2::TEXT IS NULL OR POSITION(LOWER($2) IN LOWER(name)) > 0)
            ORDER BY uploaded_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(owner_id)
        .bind(search)
        .bind(meta.page_size)
        .bind(meta.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((files, meta))
    }

    pub async fn stats(&self, owner_id: Uuid) -> Result<FileStatsDto> {
        let files = self.list_files(owner_id).await?;
        Ok(compute_stats(&files, self.storage_quota, Utc::now()))
    }

    pub async fn find(&self, file_id: Uuid) -> Result<FileRecord> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }

    /// Delete one file (owner only)
    pub async fn delete(&self, owner_id: Uuid, file_id: Uuid) -> Result<()> {
        let file = self.find(file_id).await?;
        if file.owner_id != owner_id {
            return Err(AppError::Forbidden(
                "You do not have permission to delete this file".to_string(),
            ));
        }
        self.delete_records(owner_id, vec![file]).await?;
        Ok(())
    }

    /// Delete every listed file the caller owns; returns how many went
    pub async fn bulk_delete(&self, owner_id: Uuid, file_ids: &[Uuid]) -> Result<i64> {
        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE id = ANY($1) AND owner_id = $2",
        )
        .bind(file_ids)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        if files.is_empty() {
            return Err(AppError::NotFound("No matching files found".to_string()));
        }
        if files.len() < file_ids.len() {
            warn!(
                "Bulk delete by {}: {} of {} ids not owned or missing",
                owner_id,
                file_ids.len() - files.len(),
                file_ids.len()
            );
        }

        self.delete_records(owner_id, files).await
    }

    /// Rows first (share links, comments, file, activity) in one
    /// transaction, then the stored objects.
    async fn delete_records(&self, owner_id: Uuid, files: Vec<FileRecord>) -> Result<i64> {
        let ids: Vec<Uuid> = files.iter().map(|f| f.id).collect();
        let mut tx = self.pool.begin().await?;

        let share_pairs = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT shared_by, shared_with FROM shared_files WHERE file_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        let comment_pairs = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT DISTINCT comment_by, comment_to FROM file_comments WHERE file_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM shared_files WHERE file_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM files WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?
            .rows_affected() as i64;

        for file in &files {
            ActivityService::record(&mut *tx, owner_id, ActivityType::Delete, &file.name).await?;
        }
        tx.commit().await?;

        for file in &files {
            if let Err(e) = self.store.delete(&file.storage_key).await {
                warn!("Failed to delete stored object {}: {}", file.storage_key, e);
            }
        }

        info!("Deleted {} file(s) for owner {}", deleted, owner_id);

        self.change_feed
            .publish(ChangeEvent::FilesChanged { owner_id });
        self.change_feed
            .publish(ChangeEvent::ActivityRecorded { user_id: owner_id });
        if !share_pairs.is_empty() {
            let participants: BTreeSet<Uuid> = share_pairs
                .iter()
                .flat_map(|(by, with)| [*by, *with])
                .collect();
            self.change_feed.publish(ChangeEvent::SharesChanged {
                participants: participants.into_iter().collect(),
            });
        }
        for (author_id, recipient_id) in comment_pairs {
            self.change_feed.publish(ChangeEvent::CommentsChanged {
                author_id,
                recipient_id,
            });
        }

        Ok(deleted)
    }

    /// Presigned download URL for the owner or a share recipient
    pub async fn download_url(&self, user_id: Uuid, file_id: Uuid) -> Result<String> {
        let file = self.find(file_id).await?;

        if file.owner_id != user_id {
            let shared: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM shared_files WHERE file_id = $1 AND shared_with = $2)",
            )
            .bind(file_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

            if !shared {
                return Err(AppError::Forbidden(
                    "You do not have access to this file".to_string(),
                ));
            }
        }

        self.store.presigned_url(&file.storage_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::lazy_test_pool;
    use crate::modules::storage::memory::InMemoryObjectStore;

    fn file(size: i64, days_ago: i64, now: DateTime<Utc>) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            name: "f".to_string(),
            size,
            file_type: "PDF".to_string(),
            extension: "pdf".to_string(),
            url: String::new(),
            storage_key: String::new(),
            uploaded_at: now - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_plan_upload_for_report_pdf() {
        let owner = Uuid::new_v4();
        let plan = plan_upload("files", owner, "report.pdf");

        assert_eq!(plan.file_type, "PDF");
        assert_eq!(plan.extension, "pdf");
        assert!(plan
            .storage_key
            .starts_with(&format!("files/{}/", owner)));
        assert!(plan.storage_key.ends_with(".pdf"));
    }

    #[test]
    fn test_plan_upload_unknown_extension() {
        let plan = plan_upload("files", Uuid::new_v4(), "Archive.ZIP");
        assert_eq!(plan.file_type, "ZIP");
        assert_eq!(plan.extension, "zip");
    }

    #[test]
    fn test_uploading_report_pdf_changes_stats() {
        let now = Utc::now();
        let quota = 1024 * 1024 * 1024;
        let mut files = vec![file(1_000, 30, now)];
        let before = compute_stats(&files, quota, now);

        files.push(file(500_000, 0, now));
        let after = compute_stats(&files, quota, now);

        assert_eq!(after.total_files, before.total_files + 1);
        assert_eq!(after.storage_used, before.storage_used + 500_000);
        assert_eq!(after.recent_uploads, before.recent_uploads + 1);
    }

    #[test]
    fn test_stats_recent_uses_whole_days() {
        let now = Utc::now();
        let files = vec![
            file(1, 0, now),
            file(1, 6, now),
            file(1, 7, now),
            file(1, 10, now),
        ];
        let stats = compute_stats(&files, 1024, now);
        assert_eq!(stats.recent_uploads, 2);
        assert_eq!(stats.storage_used_formatted, "4 Bytes");
    }

    #[test]
    fn test_stats_percent_of_quota() {
        let now = Utc::now();
        let files = vec![file(536_870_912, 1, now)];
        let stats = compute_stats(&files, 1_073_741_824, now);
        assert_eq!(stats.storage_percent, 50);
        assert_eq!(stats.storage_used_formatted, "512 MB");
    }

    #[test]
    fn test_empty_stats() {
        let stats = compute_stats(&[], 1_073_741_824, Utc::now());
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.storage_used_formatted, "0 Bytes");
        assert_eq!(stats.storage_percent, 0);
    }

    fn service(store: Arc<InMemoryObjectStore>) -> FileService {
        FileService::new(
            lazy_test_pool(),
            store,
            ChangeFeed::default(),
            Arc::new(UploadProgressTracker::new()),
            1024,
        )
    }

    #[tokio::test]
    async fn test_storage_failure_marks_upload_failed() {
        let store = Arc::new(InMemoryObjectStore::failing());
        let service = service(store.clone());
        let owner = Uuid::new_v4();
        service.progress().start(owner, "up-1", "report.pdf");

        let result = service
            .upload(owner, "report.pdf", "application/pdf", vec![0; 10], Some("up-1"))
            .await;

        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
        let progress = service.progress().get(owner, "up-1").unwrap();
        assert_eq!(progress.stage, UploadStage::Failed);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_record_failure_removes_stored_object() {
        let store = Arc::new(InMemoryObjectStore::default());
        let service = service(store.clone());
        let owner = Uuid::new_v4();
        service.progress().start(owner, "up-2", "report.pdf");

        // the lazy pool points at a closed port, so the insert fails
        let result = service
            .upload(owner, "report.pdf", "application/pdf", vec![0; 10], Some("up-2"))
            .await;

        assert!(result.is_err());
        assert_eq!(store.len(), 0);
        let progress = service.progress().get(owner, "up-2").unwrap();
        assert_eq!(progress.stage, UploadStage::Failed);
        assert_eq!(progress.percent, 98);
    }
}
