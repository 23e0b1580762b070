use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::comments::models::{CommentTab, CommentWithDepartment, Reaction};
use crate::features::users::models::department::full_name;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CommentQuery {
    /// `all`, `sent` or `received`
    #[serde(default)]
    pub tab: CommentTab,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateCommentDto {
    /// Share link the comment is attached to
    pub share_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateCommentDto {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReplyDto {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReactDto {
    pub reaction: Reaction,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentDto {
    pub id: Uuid,
    pub file_id: Uuid,
    pub file_name: String,
    pub comment_by: Uuid,
    pub comment_by_email: String,
    pub comment_to: Uuid,
    pub body: String,
    /// Author's department name ("Unknown Department" when the account is gone)
    pub department: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub likes: i32,
    pub dislikes: i32,
    pub reply_to: Option<Uuid>,
    pub has_response: bool,
}

impl From<CommentWithDepartment> for CommentDto {
    fn from(row: CommentWithDepartment) -> Self {
        let c = row.comment;
        Self {
            id: c.id,
            file_id: c.file_id,
            file_name: c.file_name,
            comment_by: c.comment_by,
            comment_by_email: c.comment_by_email,
            comment_to: c.comment_to,
            body: c.body,
            department: row
                .author_department
                .as_deref()
                .map(full_name)
                .unwrap_or_else(|| "Unknown Department".to_string()),
            created_at: c.created_at,
            edited_at: c.edited_at,
            likes: c.likes,
            dislikes: c.dislikes,
            reply_to: c.reply_to,
            has_response: c.has_response,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommentStatsDto {
    pub total_sent: i64,
    pub total_received: i64,
    /// Comments created within the last 7 days
    pub recent_comments: i64,
    /// Received comments without a reply yet
    pub pending_responses: i64,
}

/// One frame of the live comments stream
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentFeedDto {
    pub comments: Vec<CommentDto>,
    pub stats: CommentStatsDto,
}
