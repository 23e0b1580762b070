use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::activities::models::Activity;
use crate::shared::constants::RECENT_ACTIVITY_LIMIT;

const MAX_ACTIVITY_LIMIT: i64 = 50;

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ActivityQuery {
    /// Number of entries (default: 5, max: 50)
    pub limit: Option<i64>,
}

impl ActivityQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(RECENT_ACTIVITY_LIMIT)
            .clamp(1, MAX_ACTIVITY_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityDto {
    pub id: Uuid,
    /// upload, share or delete
    #[serde(rename = "type")]
    pub activity_type: String,
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Activity> for ActivityDto {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id,
            activity_type: activity.activity_type,
            file_name: activity.file_name,
            timestamp: activity.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_and_clamps() {
        assert_eq!(ActivityQuery { limit: None }.limit(), 5);
        assert_eq!(ActivityQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(ActivityQuery { limit: Some(500) }.limit(), 50);
    }

    #[test]
    fn test_serializes_type_field() {
        let dto = ActivityDto {
            id: Uuid::nil(),
            activity_type: "upload".to_string(),
            file_name: "report.pdf".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["type"], "upload");
    }
}
