//! Subscriber that records what it receives.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};

use crate::orchestrator::{StatusEvent, Subscriber, SubscriberWriteError};

/// In-memory subscriber for testing.
///
/// Records every event it accepts. [`disconnect`](Self::disconnect)
/// simulates the peer going away: later sends fail as a closed connection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSubscriber {
    events: Arc<RwLock<Vec<StatusEvent>>>,
    disconnected: Arc<RwLock<bool>>,
    closed: Arc<RwLock<bool>>,
    delay: Duration,
    notify: Arc<Notify>,
}

impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send take `delay` before it completes.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Simulate the client going away.
    pub async fn disconnect(&self) {
        *self.disconnected.write().await = true;
    }

    pub async fn events(&self) -> Vec<StatusEvent> {
        self.events.read().await.clone()
    }

    /// Whether the registry closed this subscriber.
    pub async fn is_closed(&self) -> bool {
        *self.closed.read().await
    }

    /// Waits until a terminal event arrives and returns everything received.
    pub async fn wait_for_terminal(&self) -> Vec<StatusEvent> {
        self.wait_until(|events| events.iter().any(StatusEvent::is_terminal))
            .await
    }

    /// Waits until at least `count` events arrived.
    pub async fn wait_for_events(&self, count: usize) -> Vec<StatusEvent> {
        self.wait_until(|events| events.len() >= count).await
    }

    async fn wait_until(&self, done: impl Fn(&[StatusEvent]) -> bool) -> Vec<StatusEvent> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let events = self.events().await;
            if done(&events) {
                return events;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Subscriber for RecordingSubscriber {
    async fn send(&self, event: &StatusEvent) -> Result<(), SubscriberWriteError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if *self.disconnected.read().await || *self.closed.read().await {
            return Err(SubscriberWriteError::Closed);
        }
        self.events.write().await.push(event.clone());
        self.notify.notify_waiters();
        Ok(())
    }

    async fn close(&self) {
        *self.closed.write().await = true;
    }
}
