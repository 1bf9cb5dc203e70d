//! Encoder progress: the shared snapshot and the stderr line parser.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Latest progress reported by the encoder for the running job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub frame: u64,
    pub fps: f64,
    pub speed: String,
}

/// Fields parsed from one progress line. Absent fields leave the snapshot alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    pub speed: Option<String>,
}

impl ProgressUpdate {
    pub fn is_empty(&self) -> bool {
        self.frame.is_none() && self.fps.is_none() && self.speed.is_none()
    }
}

/// Shared, lock-guarded progress snapshot.
///
/// The encoder writes through [`apply`](Self::apply); the broadcaster reads
/// through [`snapshot`](Self::snapshot). Cloning shares the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    inner: Arc<RwLock<ProgressSnapshot>>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current snapshot.
    pub async fn snapshot(&self) -> ProgressSnapshot {
        self.inner.read().await.clone()
    }

    /// Clears the snapshot before a new job starts.
    pub async fn reset(&self) {
        *self.inner.write().await = ProgressSnapshot::default();
    }

    /// Merges an update. The frame counter never moves backwards.
    pub async fn apply(&self, update: &ProgressUpdate) {
        if update.is_empty() {
            return;
        }
        let mut snapshot = self.inner.write().await;
        if let Some(frame) = update.frame {
            snapshot.frame = snapshot.frame.max(frame);
        }
        if let Some(fps) = update.fps {
            snapshot.fps = fps;
        }
        if let Some(speed) = &update.speed {
            snapshot.speed = speed.clone();
        }
    }
}

/// Classification of one line of encoder stderr.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// Carries at least one of frame, fps or speed.
    Update(ProgressUpdate),
    /// Other progress bookkeeping (`bitrate=`, `out_time=`, `progress=end`, ...).
    Marker,
    /// Anything else; kept as diagnostic text.
    Diagnostic,
}

static FRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)frame=\s*(\d+)").expect("valid frame regex"));
static FPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)fps=\s*(\d+(?:\.\d+)?)").expect("valid fps regex"));
static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)speed=\s*(\S+)").expect("valid speed regex"));

const PROGRESS_KEYS: &[&str] = &[
    "frame",
    "fps",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

/// Classifies one line of encoder output.
///
/// Understands both the `-progress` key/value lines and the classic
/// `frame= 120 fps= 30 ... speed=1.2x` stats line.
pub fn parse_line(line: &str) -> ProgressLine {
    let line = line.trim();
    if line.is_empty() {
        return ProgressLine::Marker;
    }

    let update = ProgressUpdate {
        frame: FRAME_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok()),
        fps: FPS_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok()),
        speed: SPEED_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|s| *s != "N/A")
            .map(str::to_string),
    };

    if !update.is_empty() {
        return ProgressLine::Update(update);
    }

    match line.split_once('=') {
        Some((key, _)) if PROGRESS_KEYS.contains(&key) || key.starts_with("stream_") => {
            ProgressLine::Marker
        }
        _ => ProgressLine::Diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_lines() {
        assert_eq!(
            parse_line("frame=120"),
            ProgressLine::Update(ProgressUpdate {
                frame: Some(120),
                ..Default::default()
            })
        );
        assert_eq!(
            parse_line("fps=29.97"),
            ProgressLine::Update(ProgressUpdate {
                fps: Some(29.97),
                ..Default::default()
            })
        );
        assert_eq!(
            parse_line("speed=1.52x"),
            ProgressLine::Update(ProgressUpdate {
                speed: Some("1.52x".to_string()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_markers() {
        assert_eq!(parse_line("speed=N/A"), ProgressLine::Marker);
        assert_eq!(parse_line("progress=continue"), ProgressLine::Marker);
        assert_eq!(parse_line("out_time=00:00:04.000000"), ProgressLine::Marker);
        assert_eq!(parse_line("stream_0_0_q=28.0"), ProgressLine::Marker);
        assert_eq!(parse_line("bitrate= 512.3kbits/s"), ProgressLine::Marker);
        assert_eq!(parse_line("   "), ProgressLine::Marker);
    }

    #[test]
    fn test_stats_line() {
        let line = "frame=  240 fps= 48 q=28.0 size=    1024kB time=00:00:08.00 bitrate=1048.6kbits/s speed=1.6x";
        assert_eq!(
            parse_line(line),
            ProgressLine::Update(ProgressUpdate {
                frame: Some(240),
                fps: Some(48.0),
                speed: Some("1.6x".to_string()),
            })
        );
    }

    #[test]
    fn test_diagnostics() {
        assert_eq!(
            parse_line("Unknown encoder 'libfoo'"),
            ProgressLine::Diagnostic
        );
        assert_eq!(
            parse_line("[libx264 @ 0x55d] keyframe=no"),
            ProgressLine::Diagnostic
        );
        assert_eq!(
            parse_line("input.mp4: No such file or directory"),
            ProgressLine::Diagnostic
        );
    }

    #[tokio::test]
    async fn test_frame_never_decreases() {
        let handle = ProgressHandle::new();
        handle
            .apply(&ProgressUpdate {
                frame: Some(100),
                fps: Some(25.0),
                speed: Some("1x".to_string()),
            })
            .await;
        handle
            .apply(&ProgressUpdate {
                frame: Some(40),
                ..Default::default()
            })
            .await;

        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.frame, 100);
        assert_eq!(snapshot.fps, 25.0);
        assert_eq!(snapshot.speed, "1x");

        handle.reset().await;
        assert_eq!(handle.snapshot().await, ProgressSnapshot::default());
    }
}
