//! Error types for the encoder module.

use std::path::PathBuf;
use thiserror::Error;

/// The external tool could not be used at all.
///
/// Raised once at startup by the version checks; fatal for the daemon.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Binary missing from the search path or not runnable.
    #[error("{tool} not available at {path} (is it installed and on $PATH?)")]
    Unavailable { tool: &'static str, path: PathBuf },

    /// Spawning or talking to the tool failed for another reason.
    #[error("Failed to run {tool}: {source}")]
    Io {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Maps a spawn error, treating a missing binary as `Unavailable`.
    pub fn from_spawn(tool: &'static str, path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::Unavailable { tool, path }
        } else {
            Self::Io { tool, source }
        }
    }
}

/// Errors from probing an input file.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// ffprobe exited non-zero; the message is its own cleaned-up output.
    #[error("{message}")]
    ToolFailed { message: String },

    /// ffprobe succeeded but its report could not be parsed.
    #[error("Malformed ffprobe report: {reason}")]
    MalformedReport { reason: String },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl ProbeError {
    /// Creates a tool failure error from cleaned output.
    pub fn tool_failed(message: impl Into<String>) -> Self {
        Self::ToolFailed {
            message: message.into(),
        }
    }
}

/// Errors from turning an encode payload into ffmpeg arguments.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The payload is not a well-formed configuration document.
    #[error("Invalid encode payload: {reason}")]
    InvalidPayload { reason: String },

    /// One field holds a value the translator refuses to pass on.
    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl TranslateError {
    pub fn invalid_field(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Dotted path of the offending field, if the error is field-specific.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { field, .. } => Some(field),
            Self::InvalidPayload { .. } => None,
        }
    }
}

/// Errors from running the encoder.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// ffmpeg exited non-zero; carries its diagnostic text.
    #[error("{diagnostics}")]
    Failed {
        code: Option<i32>,
        diagnostics: String,
    },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl EncodeError {
    /// Creates a failure, falling back to the exit code when ffmpeg said nothing.
    pub fn failed(code: Option<i32>, diagnostics: impl Into<String>) -> Self {
        let diagnostics = diagnostics.into();
        let diagnostics = if diagnostics.trim().is_empty() {
            match code {
                Some(code) => format!("ffmpeg exited with status {}", code),
                None => "ffmpeg was terminated by a signal".to_string(),
            }
        } else {
            diagnostics
        };
        Self::Failed { code, diagnostics }
    }
}

/// Everything that can end one job early.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl JobError {
    /// Stage label used in logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Probe(_) => "probe",
            Self::Translate(_) => "translate",
            Self::Encode(_) => "encode",
        }
    }
}
