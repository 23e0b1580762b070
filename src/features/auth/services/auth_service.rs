use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{
    AuthResponseDto, LoginRequestDto, MeResponseDto, RegisterRequestDto,
};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::password::{self, MSG_MISSING_FIELDS};
use crate::features::auth::services::token_service::TokenService;
use crate::features::users::models::department;
use crate::features::users::models::User;
use crate::features::users::UserService;
use std::sync::Arc;
use tracing::info;

/// Service for authentication operations (register, login, logout)
pub struct AuthService {
    users: Arc<UserService>,
    token_service: Arc<TokenService>,
}

/// Trimmed, lower-cased email
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Sign-up checks in the order the form reports them. Returns the canonical
/// department code.
pub fn validate_registration(dto: &RegisterRequestDto) -> Result<&'static str> {
    if dto.email.trim().is_empty() || dto.password.is_empty() || dto.department.trim().is_empty()
    {
        return Err(AppError::Validation(MSG_MISSING_FIELDS.to_string()));
    }

    password::check_new_password(&dto.password, &dto.confirm_password)?;

    department::canonical_code(&dto.department)
        .ok_or_else(|| AppError::Validation("Please select a valid department".to_string()))
}

impl AuthService {
    pub fn new(users: Arc<UserService>, token_service: Arc<TokenService>) -> Self {
        Self {
            users,
            token_service,
        }
    }

    /// Register a new user and sign them in
    pub async fn register(&self, dto: RegisterRequestDto) -> Result<AuthResponseDto> {
        let department = validate_registration(&dto)?;
        let email = normalize_email(&dto.email);
        let password_hash = password::hash_password(&dto.password)?;

        let user = self.users.create(&email, &password_hash, department).await?;
        self.respond_with_token(user)
    }

    /// Login with email and password
    pub async fn login(&self, dto: LoginRequestDto) -> Result<AuthResponseDto> {
        let email = normalize_email(&dto.email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        if !password::verify_password(&dto.password, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        info!("User signed in: {}", user.id);
        self.respond_with_token(user)
    }

    /// End every session of the caller
    pub async fn logout(&self, user: &AuthenticatedUser) -> Result<()> {
        self.users.revoke_sessions(user.user_id).await
    }

    pub fn get_current_user(&self, user: AuthenticatedUser) -> MeResponseDto {
        MeResponseDto {
            user_id: user.user_id,
            email: user.email,
            expires_at: user.expires_at,
        }
    }

    fn respond_with_token(&self, user: User) -> Result<AuthResponseDto> {
        let token = self
            .token_service
            .issue(user.id, &user.email, user.session_version)?;

        Ok(AuthResponseDto {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            user: crate::features::users::models::UserProfile::from(user).into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::password::{MSG_PASSWORD_MISMATCH, MSG_WEAK_PASSWORD};
    use fake::{faker::internet::en::SafeEmail, Fake};

    fn dto(email: &str, password: &str, confirm: &str, department: &str) -> RegisterRequestDto {
        RegisterRequestDto {
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            department: department.to_string(),
        }
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Validation(m) => m,
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_department_reports_missing_fields() {
        let err = validate_registration(&dto("a@b.c", "Abcdefg1", "Abcdefg1", "")).unwrap_err();
        assert_eq!(message(err), MSG_MISSING_FIELDS);
    }

    #[test]
    fn test_mismatch_reported_before_strength() {
        let err = validate_registration(&dto("a@b.c", "abc", "abd", "PGSO")).unwrap_err();
        assert_eq!(message(err), MSG_PASSWORD_MISMATCH);
    }

    #[test]
    fn test_weak_password() {
        let err = validate_registration(&dto("a@b.c", "abcdefgh", "abcdefgh", "PGSO")).unwrap_err();
        assert_eq!(message(err), MSG_WEAK_PASSWORD);
    }

    #[test]
    fn test_department_is_canonicalised() {
        assert_eq!(
            validate_registration(&dto("a@b.c", "Abcdefg1", "Abcdefg1", "ppdo")).unwrap(),
            "PPDO"
        );
    }

    #[test]
    fn test_unknown_department_rejected() {
        assert!(validate_registration(&dto("a@b.c", "Abcdefg1", "Abcdefg1", "HR")).is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Juan@Example.GOV "), "juan@example.gov");
    }

    #[test]
    fn test_generated_signups_pass_validation() {
        for _ in 0..20 {
            let email: String = SafeEmail().fake();
            let signup = dto(&email.to_uppercase(), "Abcdefg1", "Abcdefg1", "pgso");

            assert_eq!(validate_registration(&signup).unwrap(), "PGSO");
            assert_eq!(normalize_email(&signup.email), email.to_lowercase());
        }
    }
}
