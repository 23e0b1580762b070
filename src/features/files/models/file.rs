use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for uploaded files
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub size: i64,
    /// Display tag (PDF, DOCX, IMG, ...)
    pub file_type: String,
    pub extension: String,
    pub url: String,
    pub storage_key: String,
    pub uploaded_at: DateTime<Utc>,
}
