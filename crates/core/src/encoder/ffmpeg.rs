//! ffmpeg-based encoder.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use super::error::{EncodeError, ToolError};
use super::progress::{parse_line, ProgressHandle, ProgressLine};
use super::tool::tool_version;
use super::traits::Encoder;
use crate::config::ToolsConfig;

const TOOL: &str = "ffmpeg";

/// Encodes by running ffmpeg and parsing its `-progress` output.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    path: PathBuf,
    log_level: String,
    diagnostic_lines: usize,
}

impl FfmpegEncoder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let defaults = ToolsConfig::default();
        Self {
            path: path.into(),
            log_level: defaults.log_level,
            diagnostic_lines: defaults.diagnostic_lines,
        }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            path: config.ffmpeg_path.clone(),
            log_level: config.log_level.clone(),
            diagnostic_lines: config.diagnostic_lines.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full ffmpeg command line for one encode.
    ///
    /// Progress goes to stderr as key/value lines, interleaved with any
    /// diagnostics ffmpeg prints at the configured log level.
    pub fn build_command_args(&self, input: &Path, output: &Path, args: &[String]) -> Vec<String> {
        let mut command = vec![
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
        ];

        command.extend(args.iter().cloned());

        command.extend([
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
            "-loglevel".to_string(),
            self.log_level.clone(),
        ]);

        command.push(output.to_string_lossy().to_string());
        command
    }
}

/// Last `capacity` diagnostic lines of a run.
#[derive(Debug)]
struct DiagnosticTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: &str) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.trim_end().to_string());
    }

    fn text(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        args: &[String],
        progress: &ProgressHandle,
    ) -> Result<(), EncodeError> {
        let command = self.build_command_args(input, output, args);
        debug!(path = %self.path.display(), args = ?command, "Running ffmpeg");

        let mut child = Command::new(&self.path)
            .args(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::from_spawn(TOOL, self.path.clone(), e))?;

        let stderr = child.stderr.take().ok_or_else(|| ToolError::Io {
            tool: TOOL,
            source: std::io::Error::other("stderr was not captured"),
        })?;

        let mut segments = BufReader::new(stderr).split(b'\n');
        let mut diagnostics = DiagnosticTail::new(self.diagnostic_lines);

        while let Some(bytes) = segments
            .next_segment()
            .await
            .map_err(|source| ToolError::Io { tool: TOOL, source })?
        {
            let text = String::from_utf8_lossy(&bytes);
            // The classic stats line is redrawn with carriage returns.
            for line in text.split('\r') {
                match parse_line(line) {
                    ProgressLine::Update(update) => progress.apply(&update).await,
                    ProgressLine::Marker => {}
                    ProgressLine::Diagnostic => {
                        trace!(line = %line.trim_end(), "ffmpeg");
                        diagnostics.push(line);
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|source| ToolError::Io { tool: TOOL, source })?;

        if status.success() {
            Ok(())
        } else {
            Err(EncodeError::failed(status.code(), diagnostics.text()))
        }
    }

    async fn version(&self) -> Result<Option<String>, ToolError> {
        tool_version(TOOL, &self.path).await
    }
}
