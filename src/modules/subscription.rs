//! Live subscription tasks tied to the lifetime of a stream.

use std::future::Future;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::modules::change_feed::ChangeEvent;

/// A spawned task that is aborted when the handle is dropped
pub struct Subscription {
    abort_handle: AbortHandle,
}

impl Subscription {
    pub fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let abort_handle = tokio::spawn(task).abort_handle();
        Self { abort_handle }
    }

    pub fn is_finished(&self) -> bool {
        self.abort_handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.abort_handle.is_finished() {
            self.abort_handle.abort();
        }
    }
}

/// Every subscription of one live stream; dropping the set tears all of them down
#[derive(Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

/// Wait for the next change-feed event for `user_id` accepted by `filter`.
///
/// Lagging behind the feed counts as a change, since events were missed.
/// Returns `false` once the feed is closed.
pub async fn wait_for_change(
    receiver: &mut broadcast::Receiver<ChangeEvent>,
    user_id: Uuid,
    filter: impl Fn(&ChangeEvent) -> bool,
) -> bool {
    loop {
        match receiver.recv().await {
            Ok(event) if event.concerns(user_id) && filter(&event) => return true,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Subscription for {} lagged by {} events", user_id, skipped);
                return true;
            }
            Err(RecvError::Closed) => return false,
        }
    }
}
