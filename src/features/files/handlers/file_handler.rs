use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::AppError;
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    BulkDeleteFilesDto, DeleteFilesResponseDto, DownloadUrlDto, FileListQuery, FileResponseDto,
    FileStatsDto, UploadFileDto, UploadQuery, MAX_FILE_SIZE,
};
use crate::features::files::services::{FileService, UploadProgress};
use crate::shared::types::{ApiResponse, Meta};

fn too_large() -> AppError {
    AppError::BadRequest(format!(
        "File too large. Maximum size is {} MB",
        MAX_FILE_SIZE / 1024 / 1024
    ))
}

/// Upload a file
///
/// Accepts multipart/form-data with a single `file` field. When `upload_id`
/// is given, progress can be polled at `/api/files/uploads/{upload_id}`.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    params(UploadQuery),
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid file or validation error"),
        (status = 401, description = "Authentication required"),
        (status = 502, description = "Storage unavailable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>), AppError> {
    let upload_id = query.upload_id.as_deref().filter(|id| !id.is_empty());
    let total = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != "file" {
            debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Filename is required".to_string()))?;

        if let Some(id) = upload_id {
            service.progress().start(user.user_id, id, &file_name);
        }

        let mut data = Vec::new();
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    let err = AppError::BadRequest(format!("Failed to read file data: {}", e));
                    if let Some(id) = upload_id {
                        service.progress().fail(user.user_id, id, &err.public_message());
                    }
                    return Err(err);
                }
            };
            data.extend_from_slice(&chunk);
            if data.len() > MAX_FILE_SIZE {
                let err = too_large();
                if let Some(id) = upload_id {
                    service.progress().fail(user.user_id, id, &err.public_message());
                }
                return Err(err);
            }
            if let Some(id) = upload_id {
                service
                    .progress()
                    .report_transfer(user.user_id, id, data.len() as u64, total);
            }
        }

        upload = Some((file_name, content_type, data));
    }

    let (file_name, content_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    let file = service
        .upload(user.user_id, &file_name, &content_type, data, upload_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(file.into()),
            Some("File uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// Poll the progress of an upload started with `upload_id`
#[utoipa::path(
    get,
    path = "/api/files/uploads/{upload_id}",
    tag = "files",
    params(
        ("upload_id" = String, Path, description = "Client generated upload id")
    ),
    responses(
        (status = 200, description = "Upload progress", body = ApiResponse<UploadProgress>),
        (status = 404, description = "Unknown upload id")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_upload_progress(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(upload_id): Path<String>,
) -> Result<Json<ApiResponse<UploadProgress>>, AppError> {
    let progress = service
        .progress()
        .get(user.user_id, &upload_id)
        .ok_or_else(|| AppError::NotFound("Upload not found".to_string()))?;
    Ok(Json(ApiResponse::success(Some(progress), None, None)))
}

/// List the caller's files, newest first, with name search and pagination
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(FileListQuery),
    responses(
        (status = 200, description = "Files retrieved successfully", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Query(query): Query<FileListQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponseDto>>>, AppError> {
    let (files, pagination) = service.list_page(user.user_id, &query).await?;
    let files: Vec<FileResponseDto> = files.into_iter().map(FileResponseDto::from).collect();

    Ok(Json(ApiResponse::success(
        Some(files),
        None,
        Some(Meta {
            total: pagination.total_items,
            pagination: Some(pagination),
        }),
    )))
}

#[utoipa::path(
    get,
    path = "/api/files/stats",
    tag = "files",
    responses(
        (status = 200, description = "File statistics", body = ApiResponse<FileStatsDto>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file_stats(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
) -> Result<Json<ApiResponse<FileStatsDto>>, AppError> {
    let stats = service.stats(user.user_id).await?;
    Ok(Json(ApiResponse::success(Some(stats), None, None)))
}

/// Delete a file along with its share links and comments
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "File deleted", body = ApiResponse<DeleteFilesResponseDto>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeleteFilesResponseDto>>, AppError> {
    service.delete(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        Some(DeleteFilesResponseDto { deleted: 1 }),
        Some("File deleted successfully".to_string()),
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/files/bulk-delete",
    tag = "files",
    request_body = BulkDeleteFilesDto,
    responses(
        (status = 200, description = "Files deleted", body = ApiResponse<DeleteFilesResponseDto>),
        (status = 400, description = "No file selected"),
        (status = 404, description = "No matching files")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn bulk_delete_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppJson(dto): AppJson<BulkDeleteFilesDto>,
) -> Result<Json<ApiResponse<DeleteFilesResponseDto>>, AppError> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let deleted = service.bulk_delete(user.user_id, &dto.file_ids).await?;
    Ok(Json(ApiResponse::success(
        Some(DeleteFilesResponseDto { deleted }),
        Some(format!("{} file(s) deleted", deleted)),
        None,
    )))
}

/// Time-limited download link for the owner or a share recipient
#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "Download URL", body = ApiResponse<DownloadUrlDto>),
        (status = 403, description = "No access to this file"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_download_url(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DownloadUrlDto>>, AppError> {
    let url = service.download_url(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        Some(DownloadUrlDto { url }),
        None,
        None,
    )))
}
