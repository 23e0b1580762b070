use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::files::models::FileRecord;
use crate::shared::constants::DEFAULT_PAGE_SIZE;
use crate::shared::format::format_bytes;
use crate::shared::types::PaginationQuery;

/// Maximum file size in bytes (50MB)
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct UploadQuery {
    /// Client generated id used to poll `/api/files/uploads/{upload_id}`
    pub upload_id: Option<String>,
}

/// Response DTO for file operations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    pub id: Uuid,
    pub name: String,
    /// Size in bytes
    pub size: i64,
    /// Human readable size ("1.5 MB")
    pub size_formatted: String,
    /// Display tag: PDF, DOCX, IMG, EXCEL, PPT, TXT or the upper-cased extension
    #[serde(rename = "type")]
    pub file_type: String,
    pub extension: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponseDto {
    fn from(file: FileRecord) -> Self {
        Self {
            id: file.id,
            size_formatted: format_bytes(file.size),
            name: file.name,
            size: file.size,
            file_type: file.file_type,
            extension: file.extension,
            url: file.url,
            uploaded_at: file.uploaded_at,
        }
    }
}

/// List query: case-insensitive name search plus pagination
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct FileListQuery {
    /// Substring of the file name (case-insensitive)
    pub search: Option<String>,

    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,

    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl FileListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileStatsDto {
    pub total_files: i64,
    /// Bytes used by the caller's files
    pub storage_used: i64,
    pub storage_used_formatted: String,
    pub storage_quota: i64,
    /// Share of the quota in use, whole percent
    pub storage_percent: i64,
    /// Files uploaded within the last 7 days
    pub recent_uploads: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkDeleteFilesDto {
    #[validate(length(min = 1, message = "Select at least one file"))]
    pub file_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFilesResponseDto {
    pub deleted: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadUrlDto {
    /// Presigned, time-limited URL
    pub url: String,
}
