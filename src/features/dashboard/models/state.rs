//! Dashboard view model kept as a reducer over independent sources.
//!
//! Every live source owns its own field. Patches only replace (or
//! max-merge) the field of their source, and every counter in the view is
//! derived from the sources on demand, so patches from different sources
//! commute and re-applying a patch is a no-op.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::features::activities::dtos::ActivityDto;
use crate::features::activities::models::Activity;
use crate::features::comments::models::CommentTab;
use crate::features::dashboard::dtos::{
    CheckpointDto, CommentNotificationsDto, DashboardCountsDto, DashboardViewDto,
    DepartmentStatsDto, RecentShareDto, ShareDirection,
};
use crate::features::shares::models::{collaboration_summary, ShareLink};
use crate::features::users::models::department::full_name;
use crate::features::users::models::UserProfile;
use crate::shared::constants::{RECENT_SHARES_LIMIT, RECENT_WINDOW_DAYS};

pub const FETCH_FAILED: &str = "Failed to fetch data";
pub const MARK_READ_FAILED: &str = "Failed to mark comments as read";

/// The two fields of a comment the dashboard needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentStamp {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Result of one pass of the record fetchers
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRecords {
    pub profile: UserProfile,
    pub owned_files: i64,
    pub outgoing: Vec<ShareLink>,
    pub incoming: Vec<ShareLink>,
    /// Comments authored by the user
    pub own_comments: i64,
    pub activities: Vec<Activity>,
    /// Latest links the user takes part in, newest first
    pub recent_links: Vec<ShareLink>,
    /// Accounts referenced by `recent_links`
    pub link_profiles: Vec<UserProfile>,
    pub fetched_at: DateTime<Utc>,
}

/// Named patch operations on [`DashboardState`]
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardPatch {
    Fetched(Box<FetchedRecords>),
    FetchFailed,
    Profile(UserProfile),
    Comments {
        scope: CommentTab,
        comments: Vec<CommentStamp>,
    },
    /// Mark-as-read issued at `at`; applied before the write completes
    MarkReadRequested { at: DateTime<Utc> },
    MarkReadConfirmed { checked_at: DateTime<Utc> },
    MarkReadFailed,
    /// Comments view opened
    CommentsViewed { at: DateTime<Utc> },
}

impl DashboardPatch {
    /// User-facing notification that accompanies this patch
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            DashboardPatch::FetchFailed => Some(FETCH_FAILED),
            DashboardPatch::MarkReadFailed => Some(MARK_READ_FAILED),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingCheckpoint {
    at: DateTime<Utc>,
    /// Confirmed checkpoint when the request was made
    baseline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    user_id: Uuid,
    fetched: Option<FetchedRecords>,
    live_profile: Option<UserProfile>,
    all_comments: Option<Vec<CommentStamp>>,
    sent_comments: Option<Vec<CommentStamp>>,
    received_comments: Option<Vec<CommentStamp>>,
    /// Highest checkpoint returned by a mark-as-read write
    written_checkpoint: Option<DateTime<Utc>>,
    pending: Option<PendingCheckpoint>,
    local_last_checked: Option<DateTime<Utc>>,
    notifications_hidden: bool,
}

fn max_time(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn count_after(comments: &Option<Vec<CommentStamp>>, checkpoint: DateTime<Utc>) -> i64 {
    comments
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|c| c.created_at > checkpoint)
        .count() as i64
}

fn len_of(comments: &Option<Vec<CommentStamp>>) -> Option<i64> {
    comments.as_ref().map(|c| c.len() as i64)
}

impl DashboardState {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            fetched: None,
            live_profile: None,
            all_comments: None,
            sent_comments: None,
            received_comments: None,
            written_checkpoint: None,
            pending: None,
            local_last_checked: None,
            notifications_hidden: false,
        }
    }

    pub fn apply(&mut self, patch: DashboardPatch) {
        match patch {
            DashboardPatch::Fetched(records) => self.fetched = Some(*records),
            DashboardPatch::FetchFailed => self.fetched = None,
            DashboardPatch::Profile(profile) => {
                self.live_profile = Some(profile);
                self.notifications_hidden = false;
            }
            DashboardPatch::Comments { scope, comments } => {
                let slot = match scope {
                    CommentTab::All => &mut self.all_comments,
                    CommentTab::Sent => &mut self.sent_comments,
                    CommentTab::Received => &mut self.received_comments,
                };
                *slot = Some(comments);
                self.notifications_hidden = false;
            }
            DashboardPatch::MarkReadRequested { at } => {
                self.pending = Some(PendingCheckpoint {
                    at,
                    baseline: self.confirmed_checkpoint(),
                });
            }
            DashboardPatch::MarkReadConfirmed { checked_at } => {
                self.written_checkpoint = max_time(self.written_checkpoint, Some(checked_at));
                self.pending = None;
            }
            DashboardPatch::MarkReadFailed => self.pending = None,
            DashboardPatch::CommentsViewed { at } => {
                self.local_last_checked = max_time(self.local_last_checked, Some(at));
                self.notifications_hidden = true;
            }
        }
    }

    /// Server-side last-comment-check: the newest value seen from any source
    pub fn confirmed_checkpoint(&self) -> Option<DateTime<Utc>> {
        let fetched = self
            .fetched
            .as_ref()
            .and_then(|f| f.profile.last_comment_check);
        let live = self
            .live_profile
            .as_ref()
            .and_then(|p| p.last_comment_check);
        max_time(max_time(fetched, live), self.written_checkpoint)
    }

    /// Pending value while no newer server value has arrived
    fn pending_checkpoint(&self) -> Option<DateTime<Utc>> {
        let pending = self.pending?;
        let confirmed = self.confirmed_checkpoint();
        (confirmed <= pending.baseline).then_some(pending.at)
    }

    /// Comments created after this instant are unread; epoch when unset
    pub fn unread_checkpoint(&self) -> DateTime<Utc> {
        max_time(self.confirmed_checkpoint(), self.pending_checkpoint())
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    fn profile(&self) -> Option<&UserProfile> {
        self.live_profile
            .as_ref()
            .or(self.fetched.as_ref().map(|f| &f.profile))
    }

    fn share_dto(&self, link: &ShareLink, profiles: &HashMap<Uuid, &UserProfile>) -> RecentShareDto {
        RecentShareDto {
            id: link.id,
            file_id: link.file_id,
            file_name: link.file_name.clone(),
            file_url: link.file_url.clone(),
            shared_by: link.shared_by,
            shared_with: link.shared_with,
            direction: if link.shared_by == self.user_id {
                ShareDirection::Sent
            } else {
                ShareDirection::Received
            },
            department_name: full_name(&link.department_id),
            department_id: link.department_id.clone(),
            shared_at: link.shared_at,
            shared_by_email: profiles.get(&link.shared_by).map(|p| p.email.clone()),
            shared_with_email: profiles.get(&link.shared_with).map(|p| p.email.clone()),
        }
    }

    pub fn view(&self) -> DashboardViewDto {
        let checkpoint = self.unread_checkpoint();
        let fetched = self.fetched.as_ref();

        let counts = DashboardCountsDto {
            my_files: fetched.map(|f| f.owned_files).unwrap_or(0),
            shared_files: fetched
                .map(|f| (f.outgoing.len() + f.incoming.len()) as i64)
                .unwrap_or(0),
            comments: len_of(&self.all_comments)
                .or(fetched.map(|f| f.own_comments))
                .unwrap_or(0),
            sent_comments: len_of(&self.sent_comments).unwrap_or(0),
            received_comments: len_of(&self.received_comments).unwrap_or(0),
        };

        let notifications = if self.notifications_hidden {
            CommentNotificationsDto::default()
        } else {
            let new_sent = count_after(&self.sent_comments, checkpoint);
            let new_received = count_after(&self.received_comments, checkpoint);
            CommentNotificationsDto {
                new_comments: new_sent + new_received,
                new_sent_comments: new_sent,
                new_received_comments: new_received,
            }
        };

        let (department_stats, shared_files, recent_activities) = match fetched {
            Some(f) => {
                let profiles: HashMap<Uuid, &UserProfile> =
                    f.link_profiles.iter().map(|p| (p.id, p)).collect();
                let summary =
                    collaboration_summary(self.user_id, f.outgoing.iter().chain(&f.incoming));
                let recent = recent_shares(&f.outgoing, &f.incoming, f.fetched_at);

                (
                    DepartmentStatsDto {
                        total_collaborations: summary.collaborations,
                        active_users: summary.collaborators,
                        departments: summary.departments,
                        recent_shares: recent
                            .into_iter()
                            .map(|l| self.share_dto(l, &profiles))
                            .collect(),
                    },
                    f.recent_links
                        .iter()
                        .map(|l| self.share_dto(l, &profiles))
                        .collect(),
                    f.activities.iter().cloned().map(ActivityDto::from).collect(),
                )
            }
            None => Default::default(),
        };

        DashboardViewDto {
            profile: self.profile().cloned().map(Into::into),
            counts,
            notifications,
            department_stats,
            shared_files,
            recent_activities,
            comment_checkpoint: CheckpointDto {
                confirmed: self.confirmed_checkpoint(),
                pending: self.pending_checkpoint(),
            },
            local_last_checked: self.local_last_checked,
        }
    }
}

/// Links from the trailing window before `fetched_at`, newest first, capped
pub fn recent_shares<'a>(
    outgoing: &'a [ShareLink],
    incoming: &'a [ShareLink],
    fetched_at: DateTime<Utc>,
) -> Vec<&'a ShareLink> {
    let cutoff = fetched_at - Duration::days(RECENT_WINDOW_DAYS);
    let mut recent: Vec<&ShareLink> = outgoing
        .iter()
        .chain(incoming)
        .filter(|l| l.shared_at > cutoff)
        .collect();
    recent.sort_by(|a, b| b.shared_at.cmp(&a.shared_at));
    recent.truncate(RECENT_SHARES_LIMIT);
    recent
}
