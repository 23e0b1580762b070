use crate::core::error::Result;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::users::dtos::{DepartmentDto, DepartmentMemberDto, UserProfileResponseDto};
use crate::features::users::services::UserService;
use crate::shared::types::{ApiResponse, Meta};
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<UserProfileResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Profile not found")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_profile(
    user: AuthenticatedUser,
    State(service): State<Arc<UserService>>,
) -> Result<Json<ApiResponse<UserProfileResponseDto>>> {
    let profile = service.get_profile(user.user_id).await?;
    Ok(Json(ApiResponse::success(Some(profile.into()), None, None)))
}

/// Departments that currently have at least one member
#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "Departments retrieved successfully", body = ApiResponse<Vec<DepartmentDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_departments(
    _user: AuthenticatedUser,
    State(service): State<Arc<UserService>>,
) -> Result<Json<ApiResponse<Vec<DepartmentDto>>>> {
    let departments: Vec<DepartmentDto> = service
        .list_departments()
        .await?
        .into_iter()
        .map(DepartmentDto::from_code)
        .collect();
    let total = departments.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(departments),
        None,
        Some(Meta::total(total)),
    )))
}

/// Colleagues in a department (the caller is never listed)
#[utoipa::path(
    get,
    path = "/api/departments/{code}/users",
    params(
        ("code" = String, Path, description = "Department code (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Department members retrieved successfully", body = ApiResponse<Vec<DepartmentMemberDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_department_users(
    user: AuthenticatedUser,
    State(service): State<Arc<UserService>>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<Vec<DepartmentMemberDto>>>> {
    let members: Vec<DepartmentMemberDto> = service
        .users_in_department(&code, user.user_id)
        .await?
        .into_iter()
        .map(DepartmentMemberDto::from)
        .collect();
    let total = members.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(members),
        None,
        Some(Meta::total(total)),
    )))
}
