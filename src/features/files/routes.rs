use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::dtos::MAX_FILE_SIZE;
use crate::features::files::handlers::{
    bulk_delete_files, delete_file, get_download_url, get_file_stats, get_upload_progress,
    list_files, upload_file,
};
use crate::features::files::services::FileService;

/// Create routes for the files feature
pub fn routes(file_service: Arc<FileService>) -> Router {
    Router::new()
        .route(
            "/api/files/upload",
            // Allow body size up to MAX_FILE_SIZE + buffer for multipart overhead
            post(upload_file).layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024 * 1024)),
        )
        .route("/api/files", get(list_files))
        .route("/api/files/stats", get(get_file_stats))
        .route("/api/files/bulk-delete", post(bulk_delete_files))
        .route("/api/files/uploads/{upload_id}", get(get_upload_progress))
        .route("/api/files/{id}", delete(delete_file))
        .route("/api/files/{id}/download", get(get_download_url))
        .with_state(file_service)
}
