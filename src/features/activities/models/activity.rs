use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of activity log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Upload,
    Share,
    Delete,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Upload => "upload",
            ActivityType::Share => "share",
            ActivityType::Delete => "delete",
        }
    }
}

/// Database model for activities
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_type: String,
    pub file_name: String,
    pub occurred_at: DateTime<Utc>,
}
