//! In-process change feed
//!
//! Every write path publishes a [`ChangeEvent`] after it commits. Live
//! subscriptions (dashboard streams, comment streams, session watchers)
//! subscribe and re-query whatever the event touches.

use tokio::sync::broadcast;
use uuid::Uuid;

/// Default broadcast buffer; slow receivers past this see `Lagged`.
pub const DEFAULT_CHANGE_FEED_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Profile row changed (last-comment-check, password, etc.)
    ProfileChanged { user_id: Uuid },
    /// Files owned by `owner_id` were added or removed
    FilesChanged { owner_id: Uuid },
    /// Share links between these users changed
    SharesChanged { participants: Vec<Uuid> },
    /// A comment authored by `author_id` to `recipient_id` was created,
    /// edited, reacted to or deleted
    CommentsChanged { author_id: Uuid, recipient_id: Uuid },
    ActivityRecorded { user_id: Uuid },
    /// All sessions of `user_id` are no longer valid
    SessionRevoked { user_id: Uuid },
}

impl ChangeEvent {
    /// Whether this event touches data visible to `user_id`
    pub fn concerns(&self, user_id: Uuid) -> bool {
        match self {
            ChangeEvent::ProfileChanged { user_id: id }
            | ChangeEvent::ActivityRecorded { user_id: id }
            | ChangeEvent::SessionRevoked { user_id: id } => *id == user_id,
            ChangeEvent::FilesChanged { owner_id } => *owner_id == user_id,
            ChangeEvent::SharesChanged { participants } => participants.contains(&user_id),
            ChangeEvent::CommentsChanged {
                author_id,
                recipient_id,
            } => *author_id == user_id || *recipient_id == user_id,
        }
    }
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event; having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::debug!(?event, "change feed publish");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_FEED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let feed = ChangeFeed::new(8);
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();
        let user_id = Uuid::new_v4();

        feed.publish(ChangeEvent::ProfileChanged { user_id });

        assert_eq!(
            a.recv().await.unwrap(),
            ChangeEvent::ProfileChanged { user_id }
        );
        assert_eq!(
            b.recv().await.unwrap(),
            ChangeEvent::ProfileChanged { user_id }
        );
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let feed = ChangeFeed::new(8);
        feed.publish(ChangeEvent::FilesChanged {
            owner_id: Uuid::new_v4(),
        });
    }

    #[test]
    fn test_concerns() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(ChangeEvent::CommentsChanged {
            author_id: other,
            recipient_id: me
        }
        .concerns(me));
        assert!(!ChangeEvent::FilesChanged { owner_id: other }.concerns(me));
        assert!(ChangeEvent::SharesChanged {
            participants: vec![other, me]
        }
        .concerns(me));
        assert!(!ChangeEvent::SessionRevoked { user_id: other }.concerns(me));
    }
}
