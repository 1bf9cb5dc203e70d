//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Encode jobs (outcomes, failing stage, duration)
//! - Progress broadcasting (ticks, events sent, subscribers dropped)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Encode jobs finished, by outcome.
pub static ENCODE_JOBS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ffmpegd_encode_jobs_total", "Total encode jobs finished"),
        &["outcome"], // "succeeded", "failed", "rejected"
    )
    .unwrap()
});

/// Failed jobs by the stage that failed.
pub static JOB_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ffmpegd_job_failures_total", "Failed encode jobs by stage"),
        &["stage"], // "probe", "translate", "encode"
    )
    .unwrap()
});

/// Wall-clock duration of encode jobs, probe included.
pub static ENCODE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("ffmpegd_encode_duration_seconds", "Duration of encode jobs")
            .buckets(vec![
                1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0,
            ]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Broadcasting
// =============================================================================

/// Progress ticks that produced a broadcast.
pub static PROGRESS_TICKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ffmpegd_progress_ticks_total",
        "Progress ticks broadcast to subscribers",
    )
    .unwrap()
});

/// Status events delivered to subscribers, by kind.
pub static STATUS_EVENTS_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ffmpegd_status_events_sent_total",
            "Status events delivered to subscribers",
        ),
        &["kind"], // "progress", "completed", "error"
    )
    .unwrap()
});

/// Subscribers removed after a failed write, by reason.
pub static SUBSCRIBERS_DROPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ffmpegd_subscribers_dropped_total",
            "Subscribers removed after a failed write",
        ),
        &["reason"], // "closed", "write", "timeout"
    )
    .unwrap()
});

/// Register all core metrics with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(ENCODE_JOBS.clone()),
        Box::new(JOB_FAILURES.clone()),
        Box::new(ENCODE_DURATION.clone()),
        // Broadcasting
        Box::new(PROGRESS_TICKS.clone()),
        Box::new(STATUS_EVENTS_SENT.clone()),
        Box::new(SUBSCRIBERS_DROPPED.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        ENCODE_JOBS.with_label_values(&["succeeded"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "ffmpegd_encode_jobs_total"));
    }
}
