use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::AuthConfig;
use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::PasswordResetConfirmDto;
use crate::features::auth::password;
use crate::features::auth::services::auth_service::normalize_email;
use crate::features::users::UserService;
use crate::modules::email::{EmailSender, VerificationEmail};
use crate::shared::validation::VERIFICATION_CODE_REGEX;

/// Stored verification code
#[derive(Debug, Clone, FromRow)]
pub struct ResetCode {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub failed_attempts: i32,
}

/// Wrong guesses allowed before the code is discarded
pub const MAX_CODE_ATTEMPTS: i32 = 5;

const MSG_CODE_INVALID: &str = "Verification code expired or invalid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeVerdict {
    Valid,
    Missing,
    Expired,
    Mismatch,
    /// Too many wrong guesses; the code no longer unlocks anything
    Exhausted,
}

/// Six random digits, never starting with 0
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..1_000_000).to_string()
}

pub fn verify_code(stored: Option<&ResetCode>, submitted: &str, now: DateTime<Utc>) -> CodeVerdict {
    match stored {
        None => CodeVerdict::Missing,
        Some(code) if now > code.expires_at => CodeVerdict::Expired,
        Some(code) if code.failed_attempts >= MAX_CODE_ATTEMPTS => CodeVerdict::Exhausted,
        Some(code) if code.code != submitted.trim() => CodeVerdict::Mismatch,
        Some(_) => CodeVerdict::Valid,
    }
}

/// One-time-code password reset
pub struct PasswordResetService {
    pool: PgPool,
    users: Arc<UserService>,
    email_sender: Arc<dyn EmailSender>,
    code_ttl: Duration,
}

impl PasswordResetService {
    pub fn new(
        pool: PgPool,
        users: Arc<UserService>,
        email_sender: Arc<dyn EmailSender>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            pool,
            users,
            email_sender,
            code_ttl: Duration::seconds(config.reset_code_ttl.as_secs() as i64),
        }
    }

    /// Store a fresh code for `email` (replacing any previous one) and mail it
    pub async fn request_code(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let code = generate_code();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO password_reset_codes (email, code, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET code = EXCLUDED.code, expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at, failed_attempts = 0
            "#,
        )
        .bind(&email)
        .bind(&code)
        .bind(now + self.code_ttl)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.email_sender
            .send_verification(&VerificationEmail::password_reset(&email, &code, now))
            .await?;

        info!("Password reset code issued for {}", email);
        Ok(())
    }

    pub async fn confirm(&self, dto: PasswordResetConfirmDto) -> Result<()> {
        if !VERIFICATION_CODE_REGEX.is_match(dto.code.trim()) {
            return Err(AppError::Validation(
                "Verification code must be 6 digits".to_string(),
            ));
        }
        password::check_new_password(&dto.new_password, &dto.confirm_password)?;

        let email = normalize_email(&dto.email);
        let stored = sqlx::query_as::<_, ResetCode>(
            "SELECT * FROM password_reset_codes WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        match verify_code(stored.as_ref(), &dto.code, Utc::now()) {
            CodeVerdict::Missing => return Err(AppError::NotFound(MSG_CODE_INVALID.to_string())),
            CodeVerdict::Exhausted => {
                self.delete_code(&email).await?;
                return Err(AppError::NotFound(MSG_CODE_INVALID.to_string()));
            }
            CodeVerdict::Expired => {
                self.delete_code(&email).await?;
                return Err(AppError::Expired(
                    "Verification code has expired".to_string(),
                ));
            }
            CodeVerdict::Mismatch => {
                let attempts = self.record_failed_attempt(&email).await?;
                warn!(
                    "Invalid verification code submitted for {} ({}/{})",
                    email, attempts, MAX_CODE_ATTEMPTS
                );
                if attempts >= MAX_CODE_ATTEMPTS {
                    self.delete_code(&email).await?;
                }
                return Err(AppError::Validation(
                    "Invalid verification code".to_string(),
                ));
            }
            CodeVerdict::Valid => {}
        }

        let user = self.users.find_by_email(&email).await?.ok_or_else(|| {
            AppError::NotFound("No account found with this email address".to_string())
        })?;

        let password_hash = password::hash_password(&dto.new_password)?;
        self.users.update_password(user.id, &password_hash).await?;
        self.delete_code(&email).await?;
        self.users.revoke_sessions(user.id).await?;

        info!("Password reset completed for user {}", user.id);
        Ok(())
    }

    async fn record_failed_attempt(&self, email: &str) -> Result<i32> {
        let attempts = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE password_reset_codes SET failed_attempts = failed_attempts + 1
            WHERE email = $1
            RETURNING failed_attempts
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempts.unwrap_or(MAX_CODE_ATTEMPTS))
    }

    async fn delete_code(&self, email: &str) -> Result<()> {
        sqlx::query("DELETE FROM password_reset_codes WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
