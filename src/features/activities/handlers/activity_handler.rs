use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::core::error::Result;
use crate::features::activities::dtos::{ActivityDto, ActivityQuery};
use crate::features::activities::services::ActivityService;
use crate::features::auth::model::AuthenticatedUser;
use crate::shared::types::{ApiResponse, Meta};

/// Caller's recent activity, newest first
#[utoipa::path(
    get,
    path = "/api/activities",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Recent activity", body = ApiResponse<Vec<ActivityDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "activities",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_activities(
    user: AuthenticatedUser,
    State(service): State<Arc<ActivityService>>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityDto>>>> {
    let activities: Vec<ActivityDto> = service
        .recent(user.user_id, query.limit())
        .await?
        .into_iter()
        .map(ActivityDto::from)
        .collect();
    let total = activities.len() as i64;

    Ok(Json(ApiResponse::success(
        Some(activities),
        None,
        Some(Meta::total(total)),
    )))
}
