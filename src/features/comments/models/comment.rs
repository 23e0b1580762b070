use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A comment on a shared file, addressed from one participant to the other
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub file_id: Uuid,
    pub file_name: String,
    pub comment_by: Uuid,
    pub comment_by_email: String,
    pub comment_to: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub likes: i32,
    pub dislikes: i32,
    /// Parent comment when this is a reply
    pub reply_to: Option<Uuid>,
    pub has_response: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentWithDepartment {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_department: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommentTab {
    /// Authored or received
    #[default]
    All,
    Sent,
    Received,
}

impl CommentTab {
    pub fn includes(&self, comment: &Comment, user_id: Uuid) -> bool {
        match self {
            CommentTab::All => comment.comment_by == user_id || comment.comment_to == user_id,
            CommentTab::Sent => comment.comment_by == user_id,
            CommentTab::Received => comment.comment_to == user_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Reaction::Like => "likes",
            Reaction::Dislike => "dislikes",
        }
    }
}

#[cfg(test)]
pub(crate) fn test_comment(
    comment_by: Uuid,
    comment_to: Uuid,
    created_at: DateTime<Utc>,
) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        file_id: Uuid::new_v4(),
        file_name: "report.pdf".to_string(),
        comment_by,
        comment_by_email: "author@example.gov".to_string(),
        comment_to,
        body: "Looks good".to_string(),
        created_at,
        edited_at: None,
        likes: 0,
        dislikes: 0,
        reply_to: None,
        has_response: false,
    }
}
