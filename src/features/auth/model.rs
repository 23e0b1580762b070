use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Caller identity resolved from a valid access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    /// Session version the token was issued under
    pub session_version: i32,
    /// Token expiry; live streams end at this instant
    pub expires_at: DateTime<Utc>,
}

/// Access token claims (HS256)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    /// Must match `users.session_version`; bumped on sign-out
    pub ver: i32,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn into_user(self) -> Option<AuthenticatedUser> {
        let user_id = Uuid::parse_str(&self.sub).ok()?;
        let expires_at = Utc.timestamp_opt(self.exp, 0).single()?;
        Some(AuthenticatedUser {
            user_id,
            email: self.email,
            session_version: self.ver,
            expires_at,
        })
    }
}
