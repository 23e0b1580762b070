use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::users::models::{User, UserProfile};
use crate::modules::change_feed::{ChangeEvent, ChangeFeed};

const PROFILE_COLUMNS: &str = "id, email, department, last_comment_check";

/// Owns the `users` table: accounts, profiles, session versions and the
/// comment read checkpoint.
pub struct UserService {
    pool: PgPool,
    change_feed: ChangeFeed,
}

impl UserService {
    pub fn new(pool: PgPool, change_feed: ChangeFeed) -> Self {
        Self { pool, change_feed }
    }

    pub async fn create(&self, email: &str, password_hash: &str, department: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, department)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(department)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("Email already registered".to_string())
            }
            other => AppError::Database(other),
        })?;

        info!("User created: id={}, department={}", user.id, user.department);
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_profile(&self, id: Uuid) -> Result<UserProfile> {
        sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User profile not found".to_string()))
    }

    /// Profiles for a set of users; missing ids are skipped
    pub async fn get_profiles(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let profiles = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM users WHERE id = ANY($1)",
            PROFILE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        debug!("Resolved {} of {} profiles", profiles.len(), ids.len());
        Ok(profiles)
    }

    pub async fn session_version(&self, id: Uuid) -> Result<Option<i32>> {
        let version: Option<i32> =
            sqlx::query_scalar("SELECT session_version FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(version)
    }

    /// Invalidate every token issued so far for this user
    pub async fn revoke_sessions(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE users SET session_version = session_version + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        info!("Sessions revoked for user {}", id);
        self.change_feed
            .publish(ChangeEvent::SessionRevoked { user_id: id });
        Ok(())
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        info!("Password updated for user {}", id);
        self.change_feed
            .publish(ChangeEvent::ProfileChanged { user_id: id });
        Ok(())
    }

    /// Move the comment read checkpoint to the database clock
    pub async fn mark_comments_read(&self, id: Uuid) -> Result<DateTime<Utc>> {
        let checked_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET last_comment_check = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING last_comment_check
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User profile not found".to_string()))?;

        debug!("Comment checkpoint for {} moved to {}", id, checked_at);
        self.change_feed
            .publish(ChangeEvent::ProfileChanged { user_id: id });
        Ok(checked_at)
    }

    /// Distinct department codes present among users
    pub async fn list_departments(&self) -> Result<Vec<String>> {
        let departments: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT department FROM users ORDER BY department")
                .fetch_all(&self.pool)
                .await?;
        Ok(departments)
    }

    /// Members of a department, excluding `exclude`
    pub async fn users_in_department(
        &self,
        department: &str,
        exclude: Uuid,
    ) -> Result<Vec<UserProfile>> {
        let users = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM users WHERE LOWER(department) = LOWER($1) AND id <> $2 ORDER BY email",
            PROFILE_COLUMNS
        ))
        .bind(department.trim())
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}
