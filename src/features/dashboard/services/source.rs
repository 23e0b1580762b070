use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::activities::ActivityService;
use crate::features::comments::models::CommentTab;
use crate::features::comments::CommentService;
use crate::features::dashboard::models::state::recent_shares;
use crate::features::dashboard::models::{CommentStamp, FetchedRecords};
use crate::features::files::FileService;
use crate::features::shares::models::ShareLink;
use crate::features::shares::ShareService;
use crate::features::users::models::UserProfile;
use crate::features::users::UserService;
use crate::shared::constants::{RECENT_ACTIVITY_LIMIT, RECENT_SHARES_LIMIT};

/// Reads and writes the dashboard aggregator depends on
#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// One pass of every record fetcher
    async fn fetch_records(&self, user_id: Uuid) -> Result<FetchedRecords>;

    async fn profile(&self, user_id: Uuid) -> Result<UserProfile>;

    async fn comments(&self, user_id: Uuid, scope: CommentTab) -> Result<Vec<CommentStamp>>;

    /// Server-assigned checkpoint
    async fn mark_comments_read(&self, user_id: Uuid) -> Result<DateTime<Utc>>;

    /// Whether a token issued under `session_version` is still honoured
    async fn session_valid(&self, user_id: Uuid, session_version: i32) -> Result<bool>;
}

/// Users whose profiles are needed to label `links`
fn referenced_users<'a>(links: impl IntoIterator<Item = &'a ShareLink>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = links
        .into_iter()
        .flat_map(|l| [l.shared_by, l.shared_with])
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

pub struct PgDashboardSource {
    users: Arc<UserService>,
    files: Arc<FileService>,
    shares: Arc<ShareService>,
    comments: Arc<CommentService>,
    activities: Arc<ActivityService>,
}

impl PgDashboardSource {
    pub fn new(
        users: Arc<UserService>,
        files: Arc<FileService>,
        shares: Arc<ShareService>,
        comments: Arc<CommentService>,
        activities: Arc<ActivityService>,
    ) -> Self {
        Self {
            users,
            files,
            shares,
            comments,
            activities,
        }
    }
}

#[async_trait]
impl DashboardSource for PgDashboardSource {
    async fn fetch_records(&self, user_id: Uuid) -> Result<FetchedRecords> {
        let fetched_at = Utc::now();
        let (profile, owned_files, outgoing, incoming, own_comments, activities, recent_links) =
            tokio::try_join!(
                self.users.get_profile(user_id),
                self.files.count(user_id),
                self.shares.shared_by(user_id),
                self.shares.shared_with(user_id),
                self.comments.authored_count(user_id),
                self.activities.recent(user_id, RECENT_ACTIVITY_LIMIT),
                self.shares.recent_for(user_id, RECENT_SHARES_LIMIT as i64),
            )?;

        let ids = referenced_users(
            recent_links
                .iter()
                .chain(recent_shares(&outgoing, &incoming, fetched_at)),
        );
        let link_profiles = self.users.get_profiles(&ids).await?;

        debug!(
            "Dashboard records for {}: {} files, {} out, {} in",
            user_id,
            owned_files,
            outgoing.len(),
            incoming.len()
        );

        Ok(FetchedRecords {
            profile,
            owned_files,
            outgoing,
            incoming,
            own_comments,
            activities,
            recent_links,
            link_profiles,
            fetched_at,
        })
    }

    async fn profile(&self, user_id: Uuid) -> Result<UserProfile> {
        self.users.get_profile(user_id).await
    }

    async fn comments(&self, user_id: Uuid, scope: CommentTab) -> Result<Vec<CommentStamp>> {
        let comments = self.comments.comments(user_id, scope).await?;
        Ok(comments
            .into_iter()
            .map(|c| CommentStamp {
                id: c.id,
                created_at: c.created_at,
            })
            .collect())
    }

    async fn mark_comments_read(&self, user_id: Uuid) -> Result<DateTime<Utc>> {
        self.users.mark_comments_read(user_id).await
    }

    async fn session_valid(&self, user_id: Uuid, session_version: i32) -> Result<bool> {
        let current = self.users.session_version(user_id).await?;
        Ok(current == Some(session_version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shares::models::share::test_link;

    #[test]
    fn test_referenced_users_are_distinct() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();
        let links = [
            test_link(a, b, "PTO", now),
            test_link(a, c, "PTO", now),
            test_link(b, a, "OPG", now),
        ];

        let mut ids = referenced_users(&links);
        let mut expected = vec![a, b, c];
        ids.sort();
        expected.sort();

        assert_eq!(ids, expected);
    }
}
