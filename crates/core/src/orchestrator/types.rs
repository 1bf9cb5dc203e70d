//! Types for the encode orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::encoder::ProgressSnapshot;

/// Message pushed to every subscriber: progress ticks and terminal events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub percent: f64,
    pub speed: String,
    pub fps: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusEvent {
    /// A progress tick.
    pub fn progress(percent: f64, snapshot: &ProgressSnapshot) -> Self {
        Self {
            percent,
            speed: snapshot.speed.clone(),
            fps: snapshot.fps,
            error: None,
        }
    }

    /// Terminal event of a successful job.
    pub fn completed() -> Self {
        Self {
            percent: 100.0,
            speed: String::new(),
            fps: 0.0,
            error: None,
        }
    }

    /// Terminal event of a failed or rejected job.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            percent: 0.0,
            speed: String::new(),
            fps: 0.0,
            error: Some(message.into()),
        }
    }

    /// Completed and error events end a job; progress ticks do not.
    pub fn is_terminal(&self) -> bool {
        self.error.is_some() || self.percent >= 100.0
    }

    /// Label used in metrics.
    pub fn kind(&self) -> &'static str {
        if self.error.is_some() {
            "error"
        } else if self.percent >= 100.0 {
            "completed"
        } else {
            "progress"
        }
    }
}

/// A queued encode request. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Serialized configuration document.
    pub payload: String,
}

/// Where the orchestrator is in the current job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    #[default]
    Idle,
    Probing,
    Translating,
    Running,
    Succeeded,
    Failed,
}

impl JobPhase {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Probing | Self::Translating | Self::Running)
    }
}

/// The job currently being processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveJob {
    pub id: Uuid,
    pub input: PathBuf,
    pub output: PathBuf,
    pub started_at: DateTime<Utc>,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the dispatch loop is running.
    pub running: bool,
    pub phase: JobPhase,
    pub current_job: Option<ActiveJob>,
    /// Jobs accepted but not finished, the active one included.
    pub pending_count: usize,
    pub subscriber_count: usize,
}

/// Result of submitting a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted; `ahead` jobs will run before it.
    Queued { job_id: Uuid, ahead: usize },
    /// Refused because a job is active and the busy policy is `reject`.
    Rejected,
}

/// Errors from submitting a request.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("encode orchestrator is not running")]
    NotRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_field_is_omitted_when_absent() {
        let json = serde_json::to_value(StatusEvent::completed()).unwrap();
        assert_eq!(json, serde_json::json!({"percent": 100.0, "speed": "", "fps": 0.0}));

        let json = serde_json::to_value(StatusEvent::failed("boom")).unwrap();
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn test_progress_event_copies_snapshot() {
        let snapshot = ProgressSnapshot {
            frame: 75,
            fps: 30.0,
            speed: "1.25x".to_string(),
        };
        let event = StatusEvent::progress(25.0, &snapshot);
        assert_eq!(event.speed, "1.25x");
        assert_eq!(event.fps, 30.0);
        assert!(!event.is_terminal());
        assert_eq!(event.kind(), "progress");
    }

    #[test]
    fn test_terminal_events() {
        assert!(StatusEvent::completed().is_terminal());
        assert_eq!(StatusEvent::completed().kind(), "completed");
        assert!(StatusEvent::failed("x").is_terminal());
        assert_eq!(StatusEvent::failed("x").kind(), "error");
    }

    #[test]
    fn test_job_phase_serialization() {
        assert_eq!(
            serde_json::to_string(&JobPhase::Translating).unwrap(),
            "\"translating\""
        );
        assert!(JobPhase::Running.is_busy());
        assert!(!JobPhase::Succeeded.is_busy());
    }
}
