use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for users
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub department: String,
    pub last_comment_check: Option<DateTime<Utc>>,
    pub session_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public part of a user row, safe to hand to collaborators
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub department: String,
    pub last_comment_check: Option<DateTime<Utc>>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            department: user.department,
            last_comment_check: user.last_comment_check,
        }
    }
}
