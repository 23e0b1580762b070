use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::users::models::department;
use crate::features::users::models::UserProfile;

/// Response DTO for the caller's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfileResponseDto {
    pub id: Uuid,
    pub email: String,
    /// Department code, e.g. "PGSO"
    pub department: String,
    /// Full office name
    pub department_name: String,
    /// When the user last marked comments as read
    pub last_comment_check: Option<DateTime<Utc>>,
}

impl From<UserProfile> for UserProfileResponseDto {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            department_name: department::full_name(&profile.department),
            email: profile.email,
            department: profile.department,
            last_comment_check: profile.last_comment_check,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DepartmentDto {
    pub code: String,
    pub name: String,
}

impl DepartmentDto {
    pub fn from_code(code: String) -> Self {
        Self {
            name: department::full_name(&code),
            code,
        }
    }
}

/// A colleague that can be picked as share recipient
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepartmentMemberDto {
    pub id: Uuid,
    pub email: String,
    pub department: String,
}

impl From<UserProfile> for DepartmentMemberDto {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            department: profile.department,
        }
    }
}
