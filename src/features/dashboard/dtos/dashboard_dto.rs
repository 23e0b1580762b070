use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::activities::dtos::ActivityDto;
use crate::features::users::dtos::UserProfileResponseDto;

/// Denormalized dashboard view, sent whole on every change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardViewDto {
    pub profile: Option<UserProfileResponseDto>,
    pub counts: DashboardCountsDto,
    pub notifications: CommentNotificationsDto,
    pub department_stats: DepartmentStatsDto,
    /// Latest links the user takes part in
    pub shared_files: Vec<RecentShareDto>,
    pub recent_activities: Vec<ActivityDto>,
    pub comment_checkpoint: CheckpointDto,
    /// Set when the comments view was opened; informational only
    pub local_last_checked: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardCountsDto {
    pub my_files: i64,
    /// Outgoing plus incoming links
    pub shared_files: i64,
    pub comments: i64,
    pub sent_comments: i64,
    pub received_comments: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CommentNotificationsDto {
    pub new_comments: i64,
    pub new_sent_comments: i64,
    pub new_received_comments: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DepartmentStatsDto {
    pub total_collaborations: i64,
    /// Distinct colleagues on the other side of a link
    pub active_users: i64,
    pub departments: i64,
    /// At most 3 links from the last 7 days, newest first
    pub recent_shares: Vec<RecentShareDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ShareDirection {
    Sent,
    Received,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecentShareDto {
    pub id: Uuid,
    pub file_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub shared_by: Uuid,
    pub shared_with: Uuid,
    pub direction: ShareDirection,
    pub department_id: String,
    pub department_name: String,
    pub shared_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_by_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_with_email: Option<String>,
}

/// Last-comment-check as stored, and the locally applied value awaiting
/// confirmation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckpointDto {
    pub confirmed: Option<DateTime<Utc>>,
    pub pending: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkReadResponseDto {
    pub last_comment_check: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ViewedResponseDto {
    pub local_last_checked: DateTime<Utc>,
}
