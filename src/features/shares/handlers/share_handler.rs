use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::shares::dtos::{ShareFileDto, ShareLinkDto, ShareStatsDto, SharedFilesDto};
use crate::features::shares::services::ShareService;
use crate::shared::types::{ApiResponse, Meta};

#[utoipa::path(
    post,
    path = "/api/shares",
    request_body = ShareFileDto,
    responses(
        (status = 201, description = "File shared successfully", body = ApiResponse<Vec<ShareLinkDto>>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not the owner of the file"),
        (status = 404, description = "File or recipient not found")
    ),
    tag = "shares",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn share_file(
    user: AuthenticatedUser,
    State(service): State<Arc<ShareService>>,
    AppJson(dto): AppJson<ShareFileDto>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ShareLinkDto>>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let links: Vec<ShareLinkDto> = service
        .share(user.user_id, &dto)
        .await?
        .into_iter()
        .map(ShareLinkDto::from)
        .collect();
    let total = links.len() as i64;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(links),
            Some("File shared successfully".to_string()),
            Some(Meta::total(total)),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/shares",
    responses(
        (status = 200, description = "Shared files retrieved successfully", body = ApiResponse<SharedFilesDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "shares",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_shared_files(
    user: AuthenticatedUser,
    State(service): State<Arc<ShareService>>,
) -> Result<Json<ApiResponse<SharedFilesDto>>> {
    let (received, sent) = tokio::try_join!(
        service.received_with_sharers(user.user_id),
        service.sent_with_recipients(user.user_id)
    )?;

    let shared = SharedFilesDto {
        shared_with_me: received.into_iter().map(ShareLinkDto::received).collect(),
        shared_by_me: sent.into_iter().map(ShareLinkDto::sent).collect(),
    };
    Ok(Json(ApiResponse::success(Some(shared), None, None)))
}

#[utoipa::path(
    get,
    path = "/api/shares/stats",
    responses(
        (status = 200, description = "Share statistics", body = ApiResponse<ShareStatsDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "shares",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_share_stats(
    user: AuthenticatedUser,
    State(service): State<Arc<ShareService>>,
) -> Result<Json<ApiResponse<ShareStatsDto>>> {
    let stats = service.stats(user.user_id).await?;
    Ok(Json(ApiResponse::success(Some(stats), None, None)))
}

#[utoipa::path(
    delete,
    path = "/api/shares/{id}",
    params(
        ("id" = Uuid, Path, description = "Share link id")
    ),
    responses(
        (status = 200, description = "Share removed"),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Share not found")
    ),
    tag = "shares",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn revoke_share(
    user: AuthenticatedUser,
    State(service): State<Arc<ShareService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.revoke(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Share removed successfully".to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::lazy_test_pool;
    use crate::features::shares::routes;
    use crate::modules::change_feed::ChangeFeed;
    use crate::shared::test_helpers::with_test_user;
    use axum_test::TestServer;
    use serde_json::json;

    fn server() -> TestServer {
        let service = Arc::new(ShareService::new(lazy_test_pool(), ChangeFeed::default()));
        TestServer::new(with_test_user(routes(service))).unwrap()
    }

    #[tokio::test]
    async fn test_share_without_recipients_is_rejected() {
        let response = server()
            .post("/api/shares")
            .json(&json!({
                "file_id": Uuid::new_v4(),
                "department": "PTO",
                "recipient_ids": []
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_share_requires_json_body() {
        let response = server().post("/api/shares").text("not json").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
