//! Connected subscribers and fan-out of status events.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::types::StatusEvent;
use crate::metrics;

/// Identifier handed out by [`SubscriberRegistry::register`].
pub type SubscriberId = u64;

/// A write to a subscriber failed; the subscriber is dropped.
#[derive(Debug, Clone, Error)]
pub enum SubscriberWriteError {
    #[error("connection closed")]
    Closed,

    #[error("write failed: {0}")]
    Write(String),

    #[error("write timed out after {0:?}")]
    Timeout(Duration),
}

impl SubscriberWriteError {
    fn reason(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Write(_) => "write",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// A connected client that receives status events.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn send(&self, event: &StatusEvent) -> Result<(), SubscriberWriteError>;

    /// Closes the underlying connection. Must be safe to call more than once.
    async fn close(&self);
}

/// How a broadcast went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Set of live subscribers.
///
/// Sends happen outside the lock on a snapshot of the set, so a slow
/// client never blocks registration or removal.
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<SubscriberId, Arc<dyn Subscriber>>>,
    send_timeout: Duration,
}

impl SubscriberRegistry {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(HashMap::new()),
            send_timeout,
        }
    }

    pub async fn register(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(id, subscriber);
            subscribers.len()
        };
        debug!(subscriber_id = id, count, "Subscriber registered");
        id
    }

    /// Forgets a subscriber whose connection already ended. Does not close it.
    pub async fn remove(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.write().await.remove(&id).is_some();
        if removed {
            debug!(subscriber_id = id, "Subscriber removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Sends `event` to every subscriber concurrently.
    ///
    /// Subscribers whose write fails or times out are removed and closed.
    pub async fn broadcast(&self, event: &StatusEvent) -> BroadcastReport {
        let targets: Vec<(SubscriberId, Arc<dyn Subscriber>)> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, s)| (*id, Arc::clone(s)))
            .collect();

        if targets.is_empty() {
            return BroadcastReport::default();
        }

        let sends = targets.iter().map(|(id, subscriber)| {
            let subscriber = Arc::clone(subscriber);
            async move { (*id, self.deliver(subscriber.as_ref(), event).await) }
        });
        let results = join_all(sends).await;

        let mut report = BroadcastReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.dropped += 1;
                    self.drop_subscriber(id, &e).await;
                }
            }
        }

        if report.delivered > 0 {
            metrics::STATUS_EVENTS_SENT
                .with_label_values(&[event.kind()])
                .inc_by(report.delivered as u64);
        }
        report
    }

    /// Sends `event` to one subscriber, dropping it on failure.
    pub async fn send_to(&self, id: SubscriberId, event: &StatusEvent) -> bool {
        let subscriber = match self.subscribers.read().await.get(&id) {
            Some(s) => Arc::clone(s),
            None => return false,
        };

        match self.deliver(subscriber.as_ref(), event).await {
            Ok(()) => {
                metrics::STATUS_EVENTS_SENT
                    .with_label_values(&[event.kind()])
                    .inc();
                true
            }
            Err(e) => {
                self.drop_subscriber(id, &e).await;
                false
            }
        }
    }

    async fn deliver(
        &self,
        subscriber: &dyn Subscriber,
        event: &StatusEvent,
    ) -> Result<(), SubscriberWriteError> {
        match tokio::time::timeout(self.send_timeout, subscriber.send(event)).await {
            Ok(result) => result,
            Err(_) => Err(SubscriberWriteError::Timeout(self.send_timeout)),
        }
    }

    async fn drop_subscriber(&self, id: SubscriberId, error: &SubscriberWriteError) {
        let removed = self.subscribers.write().await.remove(&id);
        if let Some(subscriber) = removed {
            warn!(subscriber_id = id, error = %error, "Dropping subscriber");
            metrics::SUBSCRIBERS_DROPPED
                .with_label_values(&[error.reason()])
                .inc();
            subscriber.close().await;
        }
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}
