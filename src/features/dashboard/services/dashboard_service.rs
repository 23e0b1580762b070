use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::comments::models::CommentTab;
use crate::features::dashboard::dtos::DashboardViewDto;
use crate::features::dashboard::models::state::FETCH_FAILED;
use crate::features::dashboard::models::{DashboardPatch, DashboardState};
use crate::features::dashboard::services::session::{
    start_session, InboxMessage, LiveSessions, Registration, SessionEvent,
};
use crate::features::dashboard::services::source::DashboardSource;
use crate::modules::change_feed::ChangeFeed;
use crate::modules::subscription::SubscriptionSet;

/// Keeps a live dashboard running; dropping it tears every task down
pub struct SessionGuard {
    _registration: Registration,
    _subscriptions: SubscriptionSet,
}

pub struct LiveDashboard {
    events: mpsc::Receiver<SessionEvent>,
    guard: SessionGuard,
}

impl LiveDashboard {
    pub async fn next(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    pub fn into_parts(self) -> (mpsc::Receiver<SessionEvent>, SessionGuard) {
        (self.events, self.guard)
    }
}

pub struct DashboardService {
    source: Arc<dyn DashboardSource>,
    change_feed: ChangeFeed,
    sessions: Arc<LiveSessions>,
    inbox_capacity: usize,
}

impl DashboardService {
    pub fn new(
        source: Arc<dyn DashboardSource>,
        change_feed: ChangeFeed,
        inbox_capacity: usize,
    ) -> Self {
        Self {
            source,
            change_feed,
            sessions: Arc::new(LiveSessions::new()),
            inbox_capacity,
        }
    }

    pub fn sessions(&self) -> &Arc<LiveSessions> {
        &self.sessions
    }

    /// One pass of every fetcher and comment query through the reducer
    pub async fn snapshot(&self, user_id: Uuid) -> Result<DashboardViewDto> {
        let (records, all, sent, received) = tokio::try_join!(
            self.source.fetch_records(user_id),
            self.source.comments(user_id, CommentTab::All),
            self.source.comments(user_id, CommentTab::Sent),
            self.source.comments(user_id, CommentTab::Received),
        )
        .map_err(|e| {
            error!("Dashboard snapshot for {} failed: {}", user_id, e);
            AppError::ExternalServiceError(FETCH_FAILED.to_string())
        })?;

        let mut state = DashboardState::new(user_id);
        state.apply(DashboardPatch::Fetched(Box::new(records)));
        for (scope, comments) in [
            (CommentTab::All, all),
            (CommentTab::Sent, sent),
            (CommentTab::Received, received),
        ] {
            state.apply(DashboardPatch::Comments { scope, comments });
        }
        Ok(state.view())
    }

    /// Start a live dashboard for an already validated session
    pub fn open(&self, user: &AuthenticatedUser) -> LiveDashboard {
        let (inbox, events, subscriptions) = start_session(
            user,
            Arc::clone(&self.source),
            &self.change_feed,
            self.inbox_capacity,
        );
        let registration = self.sessions.register(user.user_id, inbox);
        info!("Live dashboard opened for {}", user.user_id);

        LiveDashboard {
            events,
            guard: SessionGuard {
                _registration: registration,
                _subscriptions: subscriptions,
            },
        }
    }

    /// Two-phase mark-as-read: live dashboards zero their counters at once
    /// and settle on the stored value, or revert if the write fails.
    pub async fn mark_read(&self, user_id: Uuid) -> Result<DateTime<Utc>> {
        self.sessions
            .broadcast(
                user_id,
                InboxMessage::Patch(DashboardPatch::MarkReadRequested { at: Utc::now() }),
            )
            .await;

        match self.source.mark_comments_read(user_id).await {
            Ok(checked_at) => {
                self.sessions
                    .broadcast(
                        user_id,
                        InboxMessage::Patch(DashboardPatch::MarkReadConfirmed { checked_at }),
                    )
                    .await;
                info!("Comments marked read for {} at {}", user_id, checked_at);
                Ok(checked_at)
            }
            Err(e) => {
                error!("Mark-as-read for {} failed: {}", user_id, e);
                self.sessions
                    .broadcast(user_id, InboxMessage::Patch(DashboardPatch::MarkReadFailed))
                    .await;
                Err(e)
            }
        }
    }

    /// Comments view opened; hides the badges on live dashboards only
    pub async fn viewed(&self, user_id: Uuid) -> DateTime<Utc> {
        let at = Utc::now();
        self.sessions
            .broadcast(
                user_id,
                InboxMessage::Patch(DashboardPatch::CommentsViewed { at }),
            )
            .await;
        at
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::comments::models::comment::test_comment;
    use crate::features::comments::models::Comment;
    use crate::features::dashboard::models::{CommentStamp, FetchedRecords};
    use crate::features::users::models::UserProfile;
    use crate::modules::change_feed::ChangeEvent;
    use crate::shared::test_helpers::create_test_user;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    struct FakeData {
        profile: UserProfile,
        owned_files: i64,
        comments: Vec<Comment>,
        session_version: i32,
        fail_fetch: bool,
        fail_mark_read: bool,
    }

    /// In-memory source that publishes to the feed like the real services
    pub(crate) struct FakeSource {
        data: Mutex<FakeData>,
        feed: ChangeFeed,
    }

    impl FakeSource {
        pub(crate) fn new(user_id: Uuid, feed: ChangeFeed) -> Self {
            Self {
                data: Mutex::new(FakeData {
                    profile: UserProfile {
                        id: user_id,
                        email: "tester@example.gov".to_string(),
                        department: "PTO".to_string(),
                        last_comment_check: None,
                    },
                    owned_files: 3,
                    comments: Vec::new(),
                    session_version: 0,
                    fail_fetch: false,
                    fail_mark_read: false,
                }),
                feed,
            }
        }

        fn add_comment(&self, by: Uuid, to: Uuid, created_at: DateTime<Utc>) {
            self.data
                .lock()
                .unwrap()
                .comments
                .push(test_comment(by, to, created_at));
            self.feed.publish(ChangeEvent::CommentsChanged {
                author_id: by,
                recipient_id: to,
            });
        }

        fn revoke(&self, user_id: Uuid) {
            self.data.lock().unwrap().session_version += 1;
            self.feed.publish(ChangeEvent::SessionRevoked { user_id });
        }
    }

    #[async_trait]
    impl DashboardSource for FakeSource {
        async fn fetch_records(&self, user_id: Uuid) -> Result<FetchedRecords> {
            let data = self.data.lock().unwrap();
            if data.fail_fetch {
                return Err(AppError::Internal("connection refused".to_string()));
            }
            Ok(FetchedRecords {
                profile: data.profile.clone(),
                owned_files: data.owned_files,
                outgoing: Vec::new(),
                incoming: Vec::new(),
                own_comments: data.comments.iter().filter(|c| c.comment_by == user_id).count() as i64,
                activities: Vec::new(),
                recent_links: Vec::new(),
                link_profiles: Vec::new(),
                fetched_at: Utc::now(),
            })
        }

        async fn profile(&self, _user_id: Uuid) -> Result<UserProfile> {
            Ok(self.data.lock().unwrap().profile.clone())
        }

        async fn comments(&self, user_id: Uuid, scope: CommentTab) -> Result<Vec<CommentStamp>> {
            let data = self.data.lock().unwrap();
            Ok(data
                .comments
                .iter()
                .filter(|c| scope.includes(c, user_id))
                .map(|c| CommentStamp {
                    id: c.id,
                    created_at: c.created_at,
                })
                .collect())
        }

        async fn mark_comments_read(&self, user_id: Uuid) -> Result<DateTime<Utc>> {
            let checked_at = {
                let mut data = self.data.lock().unwrap();
                if data.fail_mark_read {
                    return Err(AppError::Internal("write failed".to_string()));
                }
                let now = Utc::now();
                data.profile.last_comment_check = Some(now);
                now
            };
            self.feed.publish(ChangeEvent::ProfileChanged { user_id });
            Ok(checked_at)
        }

        async fn session_valid(&self, _user_id: Uuid, session_version: i32) -> Result<bool> {
            Ok(self.data.lock().unwrap().session_version == session_version)
        }
    }

    fn setup() -> (DashboardService, Arc<FakeSource>, AuthenticatedUser) {
        let user = create_test_user();
        let feed = ChangeFeed::default();
        let source = Arc::new(FakeSource::new(user.user_id, feed.clone()));
        let service = DashboardService::new(source.clone(), feed, 32);
        (service, source, user)
    }

    async fn wait_for(
        live: &mut LiveDashboard,
        mut accept: impl FnMut(&SessionEvent) -> bool,
    ) -> SessionEvent {
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                match live.next().await {
                    Some(event) if accept(&event) => return event,
                    Some(_) => continue,
                    None => panic!("stream ended early"),
                }
            }
        })
        .await
        .expect("timed out waiting for dashboard event")
    }

    fn snapshot_where(
        accept: impl Fn(&DashboardViewDto) -> bool,
    ) -> impl FnMut(&SessionEvent) -> bool {
        move |event| matches!(event, SessionEvent::Snapshot(view) if accept(view))
    }

    #[tokio::test]
    async fn test_snapshot_counts() {
        let (service, source, user) = setup();
        let other = Uuid::new_v4();
        let now = Utc::now();
        source.add_comment(user.user_id, other, now - Duration::hours(2));
        source.add_comment(other, user.user_id, now - Duration::hours(1));
        source.add_comment(other, user.user_id, now);

        let view = service.snapshot(user.user_id).await.unwrap();

        assert_eq!(view.counts.my_files, 3);
        assert_eq!(view.counts.comments, 3);
        assert_eq!(view.counts.sent_comments, 1);
        assert_eq!(view.counts.received_comments, 2);
        assert_eq!(view.notifications.new_comments, 3);
        assert_eq!(view.profile.map(|p| p.email).as_deref(), Some("tester@example.gov"));
    }

    #[tokio::test]
    async fn test_snapshot_failure_is_one_message() {
        let (service, source, user) = setup();
        source.data.lock().unwrap().fail_fetch = true;

        let err = service.snapshot(user.user_id).await.unwrap_err();

        assert_eq!(err.public_message(), "Failed to fetch data");
    }

    #[tokio::test]
    async fn test_live_counts_follow_comment_changes() {
        let (service, source, user) = setup();
        let other = Uuid::new_v4();
        source.add_comment(other, user.user_id, Utc::now());
        let mut live = service.open(&user);

        wait_for(&mut live, snapshot_where(|v| v.counts.received_comments == 1)).await;
        source.add_comment(other, user.user_id, Utc::now());
        wait_for(&mut live, snapshot_where(|v| v.counts.received_comments == 2)).await;
    }

    #[tokio::test]
    async fn test_live_mark_read_zeroes_until_newer_comment() {
        let (service, source, user) = setup();
        let other = Uuid::new_v4();
        source.add_comment(other, user.user_id, Utc::now() - Duration::minutes(5));
        source.add_comment(user.user_id, other, Utc::now() - Duration::minutes(1));
        let mut live = service.open(&user);
        wait_for(&mut live, snapshot_where(|v| v.notifications.new_comments == 2)).await;

        let checked_at = service.mark_read(user.user_id).await.unwrap();

        wait_for(
            &mut live,
            snapshot_where(move |v| {
                v.notifications.new_comments == 0
                    && v.comment_checkpoint.confirmed == Some(checked_at)
                    && v.comment_checkpoint.pending.is_none()
            }),
        )
        .await;

        source.add_comment(other, user.user_id, Utc::now() + Duration::seconds(1));
        let event = wait_for(&mut live, snapshot_where(|v| v.counts.received_comments == 2)).await;
        match event {
            SessionEvent::Snapshot(view) => {
                assert_eq!(view.notifications.new_received_comments, 1);
                assert_eq!(view.notifications.new_sent_comments, 0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_mark_read_notifies_and_reverts() {
        let (service, source, user) = setup();
        source.add_comment(Uuid::new_v4(), user.user_id, Utc::now() - Duration::minutes(5));
        let mut live = service.open(&user);
        wait_for(&mut live, snapshot_where(|v| v.notifications.new_comments == 1)).await;
        source.data.lock().unwrap().fail_mark_read = true;

        assert!(service.mark_read(user.user_id).await.is_err());

        wait_for(&mut live, snapshot_where(|v| v.notifications.new_comments == 0)).await;
        wait_for(&mut live, |e| {
            *e == SessionEvent::Notification("Failed to mark comments as read".to_string())
        })
        .await;
        wait_for(&mut live, snapshot_where(|v| v.notifications.new_comments == 1)).await;
    }

    #[tokio::test]
    async fn test_fetch_failure_notifies() {
        let (service, source, user) = setup();
        source.data.lock().unwrap().fail_fetch = true;
        let mut live = service.open(&user);

        wait_for(&mut live, |e| {
            *e == SessionEvent::Notification("Failed to fetch data".to_string())
        })
        .await;
    }

    #[tokio::test]
    async fn test_viewed_hides_notifications() {
        let (service, source, user) = setup();
        source.add_comment(Uuid::new_v4(), user.user_id, Utc::now());
        let mut live = service.open(&user);
        wait_for(&mut live, snapshot_where(|v| v.notifications.new_comments == 1)).await;

        let at = service.viewed(user.user_id).await;

        wait_for(
            &mut live,
            snapshot_where(move |v| {
                v.notifications.new_comments == 0 && v.local_last_checked == Some(at)
            }),
        )
        .await;
    }

    #[tokio::test]
    async fn test_sign_out_ends_stream() {
        let (service, source, user) = setup();
        let mut live = service.open(&user);
        wait_for(&mut live, |e| matches!(e, SessionEvent::Snapshot(_))).await;

        source.revoke(user.user_id);

        wait_for(&mut live, |e| *e == SessionEvent::SessionEnded).await;
        let rest = tokio::time::timeout(std::time::Duration::from_secs(5), live.next()).await;
        assert_eq!(rest.unwrap(), None);
    }

    #[tokio::test]
    async fn test_token_expiry_ends_stream() {
        let (service, _source, mut user) = setup();
        user.expires_at = Utc::now() + Duration::milliseconds(100);
        let mut live = service.open(&user);

        wait_for(&mut live, |e| *e == SessionEvent::SessionEnded).await;
    }

    #[tokio::test]
    async fn test_dropping_stream_deregisters() {
        let (service, _source, user) = setup();
        let live = service.open(&user);
        assert_eq!(service.sessions().count(user.user_id), 1);

        drop(live);

        assert_eq!(service.sessions().count(user.user_id), 0);
        // nothing left to notify
        service.viewed(user.user_id).await;
    }
}
