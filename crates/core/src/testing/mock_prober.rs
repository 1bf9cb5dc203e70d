//! Mock prober for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::encoder::{ProbeError, ProbeResult, Prober, ToolError};

/// Mock implementation of the Prober trait.
///
/// Provides controllable behavior for testing:
/// - Per-path or default probe results
/// - Simulated ffprobe failures
/// - Recording of probed paths
///
/// # Example
///
/// ```rust,ignore
/// use ffmpegd_core::testing::{probe_with_frames, MockProber};
///
/// let prober = MockProber::new().with_result(probe_with_frames(300));
/// prober.set_failure("missing.mp4: No such file or directory").await;
///
/// let err = prober.probe(Path::new("missing.mp4")).await.unwrap_err();
/// assert_eq!(prober.probed_paths().await.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockProber {
    /// Pre-configured results by path.
    results: Arc<RwLock<HashMap<PathBuf, ProbeResult>>>,
    /// Result for paths without a configured one.
    default_result: Arc<RwLock<ProbeResult>>,
    /// If set, every probe fails with this ffprobe message.
    failure: Arc<RwLock<Option<String>>>,
    /// Paths probed so far.
    probed: Arc<RwLock<Vec<PathBuf>>>,
    /// Whether `version()` reports the binary as missing.
    unavailable: Arc<RwLock<bool>>,
}

impl Default for MockProber {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProber {
    /// Create a new mock prober reporting no streams.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(HashMap::new())),
            default_result: Arc::new(RwLock::new(ProbeResult::default())),
            failure: Arc::new(RwLock::new(None)),
            probed: Arc::new(RwLock::new(Vec::new())),
            unavailable: Arc::new(RwLock::new(false)),
        }
    }

    /// Use `result` for every path without a specific result.
    pub fn with_result(mut self, result: ProbeResult) -> Self {
        self.default_result = Arc::new(RwLock::new(result));
        self
    }

    /// Fail every probe with `message`.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Arc::new(RwLock::new(Some(message.into())));
        self
    }

    /// Report the binary as missing from `version()`.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = Arc::new(RwLock::new(true));
        self
    }

    /// Set a probe result for a specific path.
    pub async fn set_result(&self, path: impl AsRef<Path>, result: ProbeResult) {
        self.results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), result);
    }

    /// Fail every following probe with `message`.
    pub async fn set_failure(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Clear any configured failure.
    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }

    /// Get all probed paths, in order.
    pub async fn probed_paths(&self) -> Vec<PathBuf> {
        self.probed.read().await.clone()
    }
}

#[async_trait]
impl Prober for MockProber {
    async fn probe(&self, input: &Path) -> Result<ProbeResult, ProbeError> {
        self.probed.write().await.push(input.to_path_buf());

        if let Some(message) = self.failure.read().await.as_ref() {
            return Err(ProbeError::tool_failed(message.clone()));
        }

        if let Some(result) = self.results.read().await.get(input) {
            return Ok(result.clone());
        }

        Ok(self.default_result.read().await.clone())
    }

    async fn version(&self) -> Result<Option<String>, ToolError> {
        if *self.unavailable.read().await {
            return Err(ToolError::Unavailable {
                tool: "ffprobe",
                path: PathBuf::from("ffprobe"),
            });
        }
        Ok(Some("6.1.1".to_string()))
    }
}
