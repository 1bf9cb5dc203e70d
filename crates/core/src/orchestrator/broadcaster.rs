//! Periodic progress broadcasts for the running job.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::registry::SubscriberRegistry;
use super::types::StatusEvent;
use crate::encoder::ProgressHandle;
use crate::metrics;

/// Highest percentage a tick may report; 100 is reserved for completion.
const MAX_TICK_PERCENT: f64 = 99.99;

/// Percentage of `total` frames done, rounded to two decimals.
///
/// `None` when the total is unknown (zero).
pub fn percent_complete(frame: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let percent = (frame as f64 / total as f64 * 100.0 * 100.0).round() / 100.0;
    Some(percent.min(MAX_TICK_PERCENT))
}

/// Ticker task that pushes the progress snapshot to all subscribers.
#[derive(Debug)]
pub struct ProgressBroadcaster {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<usize>,
}

impl ProgressBroadcaster {
    /// Starts ticking. The first tick fires one `interval` from now.
    ///
    /// With `total_frames` unknown every tick is skipped.
    pub fn spawn(
        interval: Duration,
        total_frames: Option<u64>,
        progress: ProgressHandle,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut sent = 0usize;

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        let Some(total) = total_frames else {
                            trace!("Total frames unknown, skipping progress tick");
                            continue;
                        };
                        let snapshot = progress.snapshot().await;
                        let Some(percent) = percent_complete(snapshot.frame, total) else {
                            continue;
                        };
                        let event = StatusEvent::progress(percent, &snapshot);
                        let report = registry.broadcast(&event).await;
                        metrics::PROGRESS_TICKS.inc();
                        sent += 1;
                        trace!(percent, frame = snapshot.frame, delivered = report.delivered, "Progress tick");
                    }
                }
            }

            debug!(ticks = sent, "Progress broadcaster stopped");
            sent
        });

        Self { stop_tx, handle }
    }

    /// Stops ticking and waits for the task, so no tick can follow.
    ///
    /// Returns how many ticks were broadcast.
    pub async fn stop(self) -> usize {
        let _ = self.stop_tx.send(true);
        match self.handle.await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(error = %e, "Progress broadcaster task failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::ProgressUpdate;
    use crate::testing::RecordingSubscriber;

    #[test]
    fn test_percent_complete() {
        assert_eq!(percent_complete(75, 300), Some(25.0));
        assert_eq!(percent_complete(1, 3), Some(33.33));
        assert_eq!(percent_complete(2, 3), Some(66.67));
        assert_eq!(percent_complete(10, 0), None);
    }

    #[test]
    fn test_percent_complete_is_capped_below_100() {
        assert_eq!(percent_complete(300, 300), Some(99.99));
        assert_eq!(percent_complete(400, 300), Some(99.99));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_report_snapshot() {
        let registry = Arc::new(SubscriberRegistry::new(Duration::from_secs(1)));
        let subscriber = RecordingSubscriber::new();
        registry.register(Arc::new(subscriber.clone())).await;
        let progress = ProgressHandle::new();

        let broadcaster = ProgressBroadcaster::spawn(
            Duration::from_secs(1),
            Some(200),
            progress.clone(),
            Arc::clone(&registry),
        );

        progress
            .apply(&ProgressUpdate {
                frame: Some(50),
                fps: Some(24.0),
                speed: Some("2x".to_string()),
            })
            .await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(broadcaster.stop().await, 1);
        let events = subscriber.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].percent, 25.0);
        assert_eq!(events[0].speed, "2x");
        assert_eq!(events[0].fps, 24.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_total_skips_ticks() {
        let registry = Arc::new(SubscriberRegistry::new(Duration::from_secs(1)));
        let subscriber = RecordingSubscriber::new();
        registry.register(Arc::new(subscriber.clone())).await;

        let broadcaster = ProgressBroadcaster::spawn(
            Duration::from_secs(1),
            None,
            ProgressHandle::new(),
            Arc::clone(&registry),
        );
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(broadcaster.stop().await, 0);
        assert!(subscriber.events().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick() {
        let registry = Arc::new(SubscriberRegistry::new(Duration::from_secs(1)));
        let broadcaster = ProgressBroadcaster::spawn(
            Duration::from_secs(1),
            Some(100),
            ProgressHandle::new(),
            registry,
        );
        assert_eq!(broadcaster.stop().await, 0);
    }
}
