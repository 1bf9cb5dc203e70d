//! Mock encoder for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::encoder::{EncodeError, Encoder, ProgressHandle, ProgressUpdate, ToolError};

/// A recorded encode invocation for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEncode {
    pub input: PathBuf,
    pub output: PathBuf,
    pub args: Vec<String>,
}

/// One scripted progress report: wait `delay`, then report `frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeStep {
    pub delay: Duration,
    pub frame: u64,
    pub fps: f64,
    pub speed: String,
}

/// Mock implementation of the Encoder trait.
///
/// Plays back a script of progress steps against the progress handle, then
/// succeeds or fails as configured. Time is taken with `tokio::time::sleep`,
/// so tests can run under a paused clock.
///
/// # Example
///
/// ```rust,ignore
/// use ffmpegd_core::testing::MockEncoder;
///
/// let encoder = MockEncoder::new()
///     .with_step(Duration::from_millis(500), 75)
///     .with_step(Duration::from_secs(1), 150)
///     .with_failure("Conversion failed!");
///
/// let result = encoder.encode(&input, &output, &args, &progress).await;
/// assert!(result.is_err());
/// assert_eq!(encoder.invocations().await.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockEncoder {
    steps: Arc<RwLock<Vec<EncodeStep>>>,
    /// If set, the encode fails with this diagnostic text after the steps.
    failure: Arc<RwLock<Option<String>>>,
    invocations: Arc<RwLock<Vec<RecordedEncode>>>,
    unavailable: Arc<RwLock<bool>>,
}

impl Default for MockEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEncoder {
    /// Create a new mock encoder that succeeds immediately.
    pub fn new() -> Self {
        Self {
            steps: Arc::new(RwLock::new(Vec::new())),
            failure: Arc::new(RwLock::new(None)),
            invocations: Arc::new(RwLock::new(Vec::new())),
            unavailable: Arc::new(RwLock::new(false)),
        }
    }

    /// Append a progress step reporting 30 fps at 1x.
    pub fn with_step(self, delay: Duration, frame: u64) -> Self {
        self.with_progress(EncodeStep {
            delay,
            frame,
            fps: 30.0,
            speed: "1x".to_string(),
        })
    }

    /// Append a progress step.
    pub fn with_progress(mut self, step: EncodeStep) -> Self {
        let mut steps = self.steps.try_read().map(|s| s.clone()).unwrap_or_default();
        steps.push(step);
        self.steps = Arc::new(RwLock::new(steps));
        self
    }

    /// Fail after the scripted steps with `diagnostics`.
    pub fn with_failure(mut self, diagnostics: impl Into<String>) -> Self {
        self.failure = Arc::new(RwLock::new(Some(diagnostics.into())));
        self
    }

    /// Report the binary as missing from `version()`.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = Arc::new(RwLock::new(true));
        self
    }

    /// Replace the script for following encodes.
    pub async fn set_steps(&self, steps: Vec<EncodeStep>) {
        *self.steps.write().await = steps;
    }

    /// Set or clear the failure for following encodes.
    pub async fn set_failure(&self, diagnostics: Option<String>) {
        *self.failure.write().await = diagnostics;
    }

    /// Get all recorded invocations.
    pub async fn invocations(&self) -> Vec<RecordedEncode> {
        self.invocations.read().await.clone()
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        args: &[String],
        progress: &ProgressHandle,
    ) -> Result<(), EncodeError> {
        self.invocations.write().await.push(RecordedEncode {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            args: args.to_vec(),
        });

        let steps = self.steps.read().await.clone();
        for step in steps {
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            progress
                .apply(&ProgressUpdate {
                    frame: Some(step.frame),
                    fps: Some(step.fps),
                    speed: Some(step.speed),
                })
                .await;
        }

        match self.failure.read().await.as_ref() {
            Some(diagnostics) => Err(EncodeError::failed(Some(1), diagnostics.clone())),
            None => Ok(()),
        }
    }

    async fn version(&self) -> Result<Option<String>, ToolError> {
        if *self.unavailable.read().await {
            return Err(ToolError::Unavailable {
                tool: "ffmpeg",
                path: PathBuf::from("ffmpeg"),
            });
        }
        Ok(Some("6.1.1".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_steps_update_progress() {
        let encoder = MockEncoder::new()
            .with_step(Duration::from_millis(100), 10)
            .with_step(Duration::from_millis(100), 20);
        let progress = ProgressHandle::new();

        encoder
            .encode(Path::new("a"), Path::new("b"), &[], &progress)
            .await
            .unwrap();

        assert_eq!(progress.snapshot().await.frame, 20);
        assert_eq!(encoder.invocations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failure() {
        let encoder = MockEncoder::new().with_failure("Conversion failed!");
        let err = encoder
            .encode(Path::new("a"), Path::new("b"), &[], &ProgressHandle::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Conversion failed!");
    }
}
