use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub subscribers: SubscribersConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served for any path not matched by the API routes.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Origins allowed to open the websocket and call `/files`.
    /// Empty means the built-in defaults; `"*"` allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Origins actually enforced, falling back to the local UI and the
    /// hosted ffmpeg-commander page.
    pub fn effective_origins(&self) -> Vec<String> {
        if self.allowed_origins.is_empty() {
            vec![
                format!("http://localhost:{}", self.port),
                "https://alfg.github.io".to_string(),
            ]
        } else {
            self.allowed_origins.clone()
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(".")
}

/// External tool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,
    /// Value passed to ffmpeg's `-loglevel`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How many trailing diagnostic lines are kept for error reports.
    #[serde(default = "default_diagnostic_lines")]
    pub diagnostic_lines: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            log_level: default_log_level(),
            diagnostic_lines: default_diagnostic_lines(),
        }
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_diagnostic_lines() -> usize {
    50
}

/// What happens to an encode request that arrives while a job is active.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Queue it; jobs run one after another in arrival order.
    #[default]
    Queue,
    /// Answer the requester with an error event and drop the request.
    Reject,
}

/// Job scheduling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    /// Interval between progress broadcasts (milliseconds).
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,
    #[serde(default)]
    pub when_busy: BusyPolicy,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval(),
            when_busy: BusyPolicy::default(),
        }
    }
}

fn default_progress_interval() -> u64 {
    1000
}

/// Subscriber delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscribersConfig {
    /// A send slower than this counts as a failed write and drops the subscriber.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
}

impl Default for SubscribersConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout(),
        }
    }
}

fn default_send_timeout() -> u64 {
    5000
}

/// Directory listing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesConfig {
    /// Root that `/files` prefixes are resolved against.
    #[serde(default = "default_files_root")]
    pub root: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: default_files_root(),
        }
    }
}

fn default_files_root() -> PathBuf {
    PathBuf::from(".")
}
