//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the ffmpegd server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection and message metrics
//! - Orchestrator status (collected dynamically)
//!
//! Job and broadcast metrics live in `ffmpegd_core::metrics` and are
//! registered here alongside the server ones.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ffmpegd_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ffmpegd_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ffmpegd_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ffmpegd_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ffmpegd_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// Upgrade attempts refused because of their Origin header.
pub static WS_ORIGIN_REJECTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ffmpegd_ws_origin_rejections_total",
        "WebSocket upgrades refused for a disallowed origin",
    )
    .unwrap()
});

/// WebSocket messages received by type.
pub static WS_MESSAGES_RECEIVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ffmpegd_ws_messages_received_total",
            "WebSocket messages received from clients",
        ),
        &["type"], // "encode", "other", "malformed"
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Orchestrator running state (1 = running, 0 = stopped).
pub static ORCHESTRATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ffmpegd_orchestrator_running",
        "Whether the orchestrator is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Jobs accepted but not finished, the active one included.
pub static JOBS_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("ffmpegd_jobs_pending", "Number of accepted, unfinished jobs").unwrap()
});

/// Registered subscribers.
pub static SUBSCRIBERS_CONNECTED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ffmpegd_subscribers_connected",
        "Number of subscribers receiving status events",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let server_metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // HTTP
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        // WebSocket
        Box::new(WS_CONNECTIONS_ACTIVE.clone()),
        Box::new(WS_CONNECTIONS_TOTAL.clone()),
        Box::new(WS_ORIGIN_REJECTIONS.clone()),
        Box::new(WS_MESSAGES_RECEIVED.clone()),
        // Orchestrator
        Box::new(ORCHESTRATOR_RUNNING.clone()),
        Box::new(JOBS_PENDING.clone()),
        Box::new(SUBSCRIBERS_CONNECTED.clone()),
    ];

    // Core metrics (jobs, broadcasting)
    let core_metrics = ffmpegd_core::metrics::all_metrics();

    for metric in server_metrics.into_iter().chain(core_metrics) {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the orchestrator as it is now.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.orchestrator().status().await;
    ORCHESTRATOR_RUNNING.set(if status.running { 1 } else { 0 });
    JOBS_PENDING.set(status.pending_count as i64);
    SUBSCRIBERS_CONNECTED.set(status.subscriber_count as i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("ffmpegd_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_server_and_core_metrics() {
        // Vec metrics only show up once a label set has been touched
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        WS_MESSAGES_RECEIVED.with_label_values(&["encode"]).inc();
        ffmpegd_core::metrics::ENCODE_JOBS
            .with_label_values(&["succeeded"])
            .inc();
        WS_CONNECTIONS_TOTAL.inc();
        ORCHESTRATOR_RUNNING.set(0);

        let output = encode_metrics();

        assert!(output.contains("ffmpegd_http_request_duration_seconds"));
        assert!(output.contains("ffmpegd_http_requests_in_flight"));
        assert!(output.contains("ffmpegd_ws_connections_active"));
        assert!(output.contains("ffmpegd_ws_connections_total"));
        assert!(output.contains("ffmpegd_ws_messages_received_total"));
        assert!(output.contains("ffmpegd_orchestrator_running"));
        assert!(output.contains("ffmpegd_jobs_pending"));
        assert!(output.contains("ffmpegd_encode_jobs_total"));
    }
}
