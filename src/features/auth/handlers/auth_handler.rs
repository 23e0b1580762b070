use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::dtos::{
    AuthResponseDto, LoginRequestDto, MeResponseDto, PasswordResetConfirmDto,
    PasswordResetRequestDto, RegisterRequestDto,
};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::services::{AuthService, PasswordResetService};
use crate::shared::types::ApiResponse;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use validator::Validate;

/// State for auth handlers
#[derive(Clone)]
pub struct AuthState {
    pub auth: Arc<AuthService>,
    pub password_reset: Arc<PasswordResetService>,
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequestDto,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<AuthResponseDto>),
        (status = 400, description = "Missing fields, password mismatch or weak password"),
        (status = 409, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AuthState>,
    AppJson(dto): AppJson<RegisterRequestDto>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponseDto>>)> {
    let auth_response = state.auth.register(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(auth_response),
            Some("Account created successfully!".to_string()),
            None,
        )),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequestDto,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AuthState>,
    AppJson(dto): AppJson<LoginRequestDto>,
) -> Result<Json<ApiResponse<AuthResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let auth_response = state.auth.login(dto).await?;
    Ok(Json(ApiResponse::success(
        Some(auth_response),
        Some("Successfully logged in!".to_string()),
        None,
    )))
}

/// Get current authenticated user info
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user retrieved successfully", body = ApiResponse<MeResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(
    user: AuthenticatedUser,
    State(state): State<AuthState>,
) -> Result<Json<ApiResponse<MeResponseDto>>> {
    let me = state.auth.get_current_user(user);
    Ok(Json(ApiResponse::success(Some(me), None, None)))
}

/// Sign out: every token issued so far stops working and live streams end
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Signed out"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(
    user: AuthenticatedUser,
    State(state): State<AuthState>,
) -> Result<Json<ApiResponse<()>>> {
    state.auth.logout(&user).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Signed out".to_string()),
        None,
    )))
}

/// Email a 6-digit password reset code
#[utoipa::path(
    post,
    path = "/api/auth/password-reset/request",
    request_body = PasswordResetRequestDto,
    responses(
        (status = 200, description = "Verification code sent"),
        (status = 400, description = "Validation error"),
        (status = 502, description = "Email delivery failed")
    ),
    tag = "auth"
)]
pub async fn request_password_reset(
    State(state): State<AuthState>,
    AppJson(dto): AppJson<PasswordResetRequestDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state.password_reset.request_code(&dto.email).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Verification code sent to your email".to_string()),
        None,
    )))
}

/// Set a new password using the emailed code
#[utoipa::path(
    post,
    path = "/api/auth/password-reset/confirm",
    request_body = PasswordResetConfirmDto,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Invalid code or password policy violation"),
        (status = 404, description = "No pending code, or no account for this email"),
        (status = 410, description = "Verification code has expired")
    ),
    tag = "auth"
)]
pub async fn confirm_password_reset(
    State(state): State<AuthState>,
    AppJson(dto): AppJson<PasswordResetConfirmDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state.password_reset.confirm(dto).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Password has been reset".to_string()),
        None,
    )))
}
