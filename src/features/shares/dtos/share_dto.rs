use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::shares::models::{ShareLink, ShareLinkWithUser};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ShareFileDto {
    pub file_id: Uuid,

    /// Department code the recipients were picked from
    #[validate(length(min = 1, message = "Please select a department"))]
    pub department: String,

    #[validate(length(min = 1, message = "Please select at least one user"))]
    pub recipient_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShareLinkDto {
    pub id: Uuid,
    pub file_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub shared_by: Uuid,
    pub shared_with: Uuid,
    pub department_id: String,
    pub shared_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_by_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_by_department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_with_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_with_department: Option<String>,
}

impl From<ShareLink> for ShareLinkDto {
    fn from(link: ShareLink) -> Self {
        Self {
            id: link.id,
            file_id: link.file_id,
            file_name: link.file_name,
            file_url: link.file_url,
            shared_by: link.shared_by,
            shared_with: link.shared_with,
            department_id: link.department_id,
            shared_at: link.shared_at,
            shared_by_email: None,
            shared_by_department: None,
            shared_with_email: None,
            shared_with_department: None,
        }
    }
}

impl ShareLinkDto {
    /// Link received by the caller, annotated with the sharer's account
    pub fn received(row: ShareLinkWithUser) -> Self {
        Self {
            shared_by_email: row.user_email,
            shared_by_department: row.user_department,
            ..row.link.into()
        }
    }

    /// Link created by the caller, annotated with the recipient's account
    pub fn sent(row: ShareLinkWithUser) -> Self {
        Self {
            shared_with_email: row.user_email,
            shared_with_department: row.user_department,
            ..row.link.into()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SharedFilesDto {
    pub shared_with_me: Vec<ShareLinkDto>,
    pub shared_by_me: Vec<ShareLinkDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShareStatsDto {
    pub total_received: i64,
    pub total_shared: i64,
    /// Links created within the last 7 days, either direction
    pub recent_shares: i64,
    pub collaborators: i64,
    pub departments: i64,
}
