//! One live dashboard: an aggregator task draining a single inbox, fed by a
//! set of subscription tasks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::comments::models::CommentTab;
use crate::features::comments::services::comment_service::FEED_FAILURE_MESSAGE;
use crate::features::dashboard::dtos::DashboardViewDto;
use crate::features::dashboard::models::{DashboardPatch, DashboardState};
use crate::features::dashboard::services::source::DashboardSource;
use crate::modules::change_feed::{ChangeEvent, ChangeFeed};
use crate::modules::subscription::{wait_for_change, Subscription, SubscriptionSet};

pub const PROFILE_FAILURE_MESSAGE: &str = "Failed to process profile update";

const BROADCAST_SEND_TIMEOUT: Duration = Duration::from_millis(250);

/// Typed partial update posted into an aggregator inbox
#[derive(Debug, Clone, PartialEq)]
pub enum InboxMessage {
    Patch(DashboardPatch),
    /// A subscription failed and will not post again
    Notify(String),
    SessionEnded,
}

/// What a live dashboard emits to its client
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Snapshot(Box<DashboardViewDto>),
    Notification(String),
    SessionEnded,
}

/// Aggregator loop; the view model is only touched here
pub async fn run_aggregator(
    user_id: Uuid,
    mut inbox: mpsc::Receiver<InboxMessage>,
    events: mpsc::Sender<SessionEvent>,
) {
    let mut state = DashboardState::new(user_id);
    let mut last_view: Option<DashboardViewDto> = None;

    while let Some(message) = inbox.recv().await {
        let patch = match message {
            InboxMessage::Patch(patch) => patch,
            InboxMessage::Notify(text) => {
                if events.send(SessionEvent::Notification(text)).await.is_err() {
                    return;
                }
                continue;
            }
            InboxMessage::SessionEnded => {
                debug!("Dashboard session for {} ended", user_id);
                let _ = events.send(SessionEvent::SessionEnded).await;
                return;
            }
        };

        if let Some(notice) = patch.notice() {
            if events
                .send(SessionEvent::Notification(notice.to_string()))
                .await
                .is_err()
            {
                return;
            }
        }

        state.apply(patch);
        let view = state.view();
        if last_view.as_ref() == Some(&view) {
            continue;
        }
        if events
            .send(SessionEvent::Snapshot(Box::new(view.clone())))
            .await
            .is_err()
        {
            return;
        }
        last_view = Some(view);
    }
}

/// Re-run `query` on every relevant change and post the result.
///
/// A failed query posts `on_failure` and ends the subscription; the last
/// posted values stay in the view.
fn live_query<Q, Fut>(
    user_id: Uuid,
    mut changes: broadcast::Receiver<ChangeEvent>,
    inbox: mpsc::Sender<InboxMessage>,
    relevant: fn(&ChangeEvent) -> bool,
    on_failure: InboxMessage,
    query: Q,
) -> Subscription
where
    Q: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<DashboardPatch>> + Send,
{
    Subscription::spawn(async move {
        loop {
            let message = match query().await {
                Ok(patch) => InboxMessage::Patch(patch),
                Err(e) => {
                    error!("Dashboard subscription for {} failed: {}", user_id, e);
                    let _ = inbox.send(on_failure).await;
                    return;
                }
            };
            if inbox.send(message).await.is_err() {
                return;
            }
            if !wait_for_change(&mut changes, user_id, relevant).await {
                debug!("Change feed closed; dashboard subscription for {} idle", user_id);
                return;
            }
        }
    })
}

fn records_changed(event: &ChangeEvent) -> bool {
    matches!(
        event,
        ChangeEvent::FilesChanged { .. }
            | ChangeEvent::SharesChanged { .. }
            | ChangeEvent::ActivityRecorded { .. }
            | ChangeEvent::CommentsChanged { .. }
    )
}

fn profile_changed(event: &ChangeEvent) -> bool {
    matches!(event, ChangeEvent::ProfileChanged { .. })
}

fn comments_changed(event: &ChangeEvent) -> bool {
    matches!(event, ChangeEvent::CommentsChanged { .. })
}

/// Ends the stream once the token expires or the user signs out
fn session_watcher(
    user: &AuthenticatedUser,
    source: Arc<dyn DashboardSource>,
    mut changes: broadcast::Receiver<ChangeEvent>,
    inbox: mpsc::Sender<InboxMessage>,
) -> Subscription {
    let user_id = user.user_id;
    let session_version = user.session_version;
    let remaining = (user.expires_at - Utc::now())
        .to_std()
        .unwrap_or_default();

    Subscription::spawn(async move {
        let expiry = tokio::time::sleep(remaining);
        tokio::pin!(expiry);
        let mut feed_open = true;

        loop {
            tokio::select! {
                _ = &mut expiry => {
                    debug!("Session token for {} expired", user_id);
                    break;
                }
                changed = wait_for_change(&mut changes, user_id, |e| {
                    matches!(e, ChangeEvent::SessionRevoked { .. })
                }), if feed_open => {
                    if !changed {
                        warn!("Change feed closed; session for {} now ends on expiry only", user_id);
                        feed_open = false;
                        continue;
                    }
                    // lag is reported as a change, so confirm before ending
                    match source.session_valid(user_id, session_version).await {
                        Ok(true) => continue,
                        Ok(false) => break,
                        Err(e) => {
                            error!("Session check for {} failed: {}", user_id, e);
                            break;
                        }
                    }
                }
            }
        }
        let _ = inbox.send(InboxMessage::SessionEnded).await;
    })
}

/// Start every subscription of one dashboard and the aggregator draining them
pub fn start_session(
    user: &AuthenticatedUser,
    source: Arc<dyn DashboardSource>,
    change_feed: &ChangeFeed,
    inbox_capacity: usize,
) -> (
    mpsc::Sender<InboxMessage>,
    mpsc::Receiver<SessionEvent>,
    SubscriptionSet,
) {
    let user_id = user.user_id;
    let (inbox_tx, inbox_rx) = mpsc::channel(inbox_capacity.max(1));
    let (events_tx, events_rx) = mpsc::channel(inbox_capacity.max(1));
    let mut subscriptions = SubscriptionSet::new();

    subscriptions.push(Subscription::spawn(run_aggregator(
        user_id, inbox_rx, events_tx,
    )));

    subscriptions.push(session_watcher(
        user,
        Arc::clone(&source),
        change_feed.subscribe(),
        inbox_tx.clone(),
    ));

    let records_source = Arc::clone(&source);
    subscriptions.push(live_query(
        user_id,
        change_feed.subscribe(),
        inbox_tx.clone(),
        records_changed,
        InboxMessage::Patch(DashboardPatch::FetchFailed),
        move || {
            let source = Arc::clone(&records_source);
            async move {
                let records = source.fetch_records(user_id).await?;
                Ok(DashboardPatch::Fetched(Box::new(records)))
            }
        },
    ));

    let profile_source = Arc::clone(&source);
    subscriptions.push(live_query(
        user_id,
        change_feed.subscribe(),
        inbox_tx.clone(),
        profile_changed,
        InboxMessage::Notify(PROFILE_FAILURE_MESSAGE.to_string()),
        move || {
            let source = Arc::clone(&profile_source);
            async move { Ok(DashboardPatch::Profile(source.profile(user_id).await?)) }
        },
    ));

    for scope in [CommentTab::All, CommentTab::Sent, CommentTab::Received] {
        let comments_source = Arc::clone(&source);
        subscriptions.push(live_query(
            user_id,
            change_feed.subscribe(),
            inbox_tx.clone(),
            comments_changed,
            InboxMessage::Notify(FEED_FAILURE_MESSAGE.to_string()),
            move || {
                let source = Arc::clone(&comments_source);
                async move {
                    let comments = source.comments(user_id, scope).await?;
                    Ok(DashboardPatch::Comments { scope, comments })
                }
            },
        ));
    }

    debug!(
        "Dashboard session for {} started with {} tasks",
        user_id,
        subscriptions.len()
    );
    (inbox_tx, events_rx, subscriptions)
}

/// Inboxes of every open dashboard, by user
#[derive(Default)]
pub struct LiveSessions {
    next_id: AtomicU64,
    inboxes: Mutex<HashMap<Uuid, Vec<(u64, mpsc::Sender<InboxMessage>)>>>,
}

impl LiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `inbox` until the returned registration is dropped
    pub fn register(
        self: &Arc<Self>,
        user_id: Uuid,
        inbox: mpsc::Sender<InboxMessage>,
    ) -> Registration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut inboxes) = self.inboxes.lock() {
            inboxes.entry(user_id).or_default().push((id, inbox));
        }
        Registration {
            sessions: Arc::clone(self),
            user_id,
            id,
        }
    }

    pub fn count(&self, user_id: Uuid) -> usize {
        self.inboxes
            .lock()
            .map(|inboxes| inboxes.get(&user_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Post `message` to every open dashboard of `user_id`. A dashboard whose
    /// client stopped reading misses the message instead of stalling the caller.
    pub async fn broadcast(&self, user_id: Uuid, message: InboxMessage) {
        let senders: Vec<mpsc::Sender<InboxMessage>> = match self.inboxes.lock() {
            Ok(inboxes) => inboxes
                .get(&user_id)
                .map(|list| list.iter().map(|(_, tx)| tx.clone()).collect())
                .unwrap_or_default(),
            Err(_) => return,
        };
        let sends = senders
            .iter()
            .map(|sender| tokio::time::timeout(BROADCAST_SEND_TIMEOUT, sender.send(message.clone())));
        for result in join_all(sends).await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(_)) => debug!("Dashboard inbox for {} already closed", user_id),
                Err(_) => warn!("Dashboard inbox for {} is full, dropping update", user_id),
            }
        }
    }

    fn remove(&self, user_id: Uuid, id: u64) {
        if let Ok(mut inboxes) = self.inboxes.lock() {
            if let Some(list) = inboxes.get_mut(&user_id) {
                list.retain(|(entry, _)| *entry != id);
                if list.is_empty() {
                    inboxes.remove(&user_id);
                }
            }
        }
    }
}

pub struct Registration {
    sessions: Arc<LiveSessions>,
    user_id: Uuid,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.sessions.remove(self.user_id, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::dashboard::models::CommentStamp;

    fn view_patch(scope: CommentTab, count: usize) -> InboxMessage {
        let comments = (0..count)
            .map(|_| CommentStamp {
                id: Uuid::new_v4(),
                created_at: Utc::now(),
            })
            .collect();
        InboxMessage::Patch(DashboardPatch::Comments { scope, comments })
    }

    #[tokio::test]
    async fn test_aggregator_skips_unchanged_views() {
        let (inbox, rx) = mpsc::channel(8);
        let (events_tx, mut events) = mpsc::channel(8);
        let task = tokio::spawn(run_aggregator(Uuid::new_v4(), rx, events_tx));

        inbox.send(view_patch(CommentTab::Sent, 2)).await.unwrap();
        inbox
            .send(InboxMessage::Patch(DashboardPatch::MarkReadFailed))
            .await
            .unwrap();
        inbox.send(InboxMessage::SessionEnded).await.unwrap();

        match events.recv().await {
            Some(SessionEvent::Snapshot(view)) => assert_eq!(view.counts.sent_comments, 2),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::Notification(
                "Failed to mark comments as read".to_string()
            ))
        );
        // the failed write left the view unchanged, so no second snapshot
        assert_eq!(events.recv().await, Some(SessionEvent::SessionEnded));
        assert_eq!(events.recv().await, None);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_registration_is_removed_on_drop() {
        let sessions = Arc::new(LiveSessions::new());
        let user = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(4);

        let registration = sessions.register(user, tx.clone());
        let second = sessions.register(user, tx);
        assert_eq!(sessions.count(user), 2);

        sessions
            .broadcast(user, InboxMessage::Notify("hi".to_string()))
            .await;
        assert_eq!(rx.recv().await, Some(InboxMessage::Notify("hi".to_string())));
        assert_eq!(rx.recv().await, Some(InboxMessage::Notify("hi".to_string())));

        drop(registration);
        assert_eq!(sessions.count(user), 1);
        drop(second);
        assert_eq!(sessions.count(user), 0);
    }

    #[tokio::test]
    async fn test_broadcast_skips_stalled_inbox() {
        let sessions = Arc::new(LiveSessions::new());
        let user = Uuid::new_v4();
        let (stalled, _never_read) = mpsc::channel(1);
        stalled
            .try_send(InboxMessage::Notify("backlog".to_string()))
            .unwrap();
        let (healthy, mut rx) = mpsc::channel(4);
        let _first = sessions.register(user, stalled);
        let _second = sessions.register(user, healthy);

        tokio::time::timeout(
            Duration::from_secs(2),
            sessions.broadcast(user, InboxMessage::SessionEnded),
        )
        .await
        .expect("broadcast must not wait on a full inbox");

        assert_eq!(rx.recv().await, Some(InboxMessage::SessionEnded));
    }

    #[test]
    fn test_change_filters() {
        let id = Uuid::new_v4();
        assert!(records_changed(&ChangeEvent::FilesChanged { owner_id: id }));
        assert!(!records_changed(&ChangeEvent::ProfileChanged { user_id: id }));
        assert!(profile_changed(&ChangeEvent::ProfileChanged { user_id: id }));
        assert!(comments_changed(&ChangeEvent::CommentsChanged {
            author_id: id,
            recipient_id: Uuid::new_v4()
        }));
        assert!(!comments_changed(&ChangeEvent::SessionRevoked { user_id: id }));
    }
}
