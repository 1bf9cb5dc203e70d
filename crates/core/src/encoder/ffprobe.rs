//! ffprobe-based prober.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::error::{ProbeError, ToolError};
use super::probe::{clean_tool_output, parse_probe_output, ProbeResult};
use super::tool::tool_version;
use super::traits::Prober;
use crate::config::ToolsConfig;

const TOOL: &str = "ffprobe";

/// Probes inputs by running ffprobe.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    path: PathBuf,
}

impl FfprobeProber {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(config.ffprobe_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn build_command_args(input: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-show_streams".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-v".to_string(),
            "error".to_string(),
        ]
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, input: &Path) -> Result<ProbeResult, ProbeError> {
        let args = Self::build_command_args(input);
        debug!(path = %self.path.display(), ?args, "Running ffprobe");

        let output = Command::new(&self.path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ToolError::from_spawn(TOOL, self.path.clone(), e))?;

        if !output.status.success() {
            let message = clean_tool_output(
                &String::from_utf8_lossy(&output.stderr),
                &String::from_utf8_lossy(&output.stdout),
            );
            return Err(ProbeError::tool_failed(message));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn version(&self) -> Result<Option<String>, ToolError> {
        tool_version(TOOL, &self.path).await
    }
}
