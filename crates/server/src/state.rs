use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use ffmpegd_core::{Config, EncodeOrchestrator};

/// Versions reported by the external tools at startup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolVersions {
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
}

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<EncodeOrchestrator>,
    tool_versions: ToolVersions,
    allowed_origins: Vec<String>,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Arc<EncodeOrchestrator>,
        tool_versions: ToolVersions,
    ) -> Self {
        let allowed_origins = config.server.effective_origins();
        Self {
            config,
            orchestrator,
            tool_versions,
            allowed_origins,
            started_at: Utc::now(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Arc<EncodeOrchestrator> {
        &self.orchestrator
    }

    pub fn tool_versions(&self) -> &ToolVersions {
        &self.tool_versions
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    /// Whether a request carrying `origin` may use the websocket or `/files`.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin))
    }

    pub fn files_root(&self) -> &Path {
        &self.config.files.root
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
