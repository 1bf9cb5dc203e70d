//! Shared helpers for running the external tools.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::error::ToolError;

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+){2})").expect("valid version regex"));

/// Runs `<path> -version` and extracts the semantic version from the banner.
///
/// A missing binary or a non-zero exit means the tool is unavailable.
/// A banner without an `x.y.z` version (e.g. git builds) yields `Ok(None)`.
pub async fn tool_version(tool: &'static str, path: &Path) -> Result<Option<String>, ToolError> {
    let output = Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ToolError::from_spawn(tool, path.to_path_buf(), e))?;

    if !output.status.success() {
        return Err(ToolError::Unavailable {
            tool,
            path: path.to_path_buf(),
        });
    }

    Ok(parse_version(&String::from_utf8_lossy(&output.stdout)))
}

/// Extracts `x.y.z` from the first line of a `-version` banner.
pub fn parse_version(banner: &str) -> Option<String> {
    let first_line = banner.lines().next()?;
    VERSION_RE
        .captures(first_line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let banner = "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023 the FFmpeg developers\nbuilt with gcc 13";
        assert_eq!(parse_version(banner).as_deref(), Some("6.1.1"));
    }

    #[test]
    fn test_parse_version_only_reads_first_line() {
        let banner = "ffprobe version N-113000-gabcdef\nlibavutil      58.  2.100";
        assert_eq!(parse_version(banner), None);
        assert_eq!(parse_version(""), None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let err = tool_version("ffmpeg", Path::new("/nonexistent/ffmpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Unavailable { tool: "ffmpeg", .. }));
    }
}
