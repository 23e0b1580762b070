use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::users::dtos::UserProfileResponseDto;

/// Request DTO for user registration
///
/// Empty fields are reported together as one "fill in all fields" error, so
/// presence is checked by the service rather than per field here.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequestDto {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub confirm_password: String,

    /// One of PGSO, OPG, PBO, PPDO, PTO
    #[serde(default)]
    #[schema(example = "PGSO")]
    pub department: String,
}

/// Request DTO for user login
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequestDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Response DTO for authentication (register/login)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponseDto {
    /// HS256 access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token expiry time in seconds
    pub expires_in: i64,
    pub user: UserProfileResponseDto,
}

/// Response DTO for `/api/auth/me`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponseDto {
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Request DTO for sending a password reset code
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequestDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Request DTO for confirming a password reset with the emailed code
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PasswordResetConfirmDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(equal = 6, message = "Verification code must be 6 digits"))]
    #[schema(example = "123456")]
    pub code: String,

    pub new_password: String,

    pub confirm_password: String,
}
