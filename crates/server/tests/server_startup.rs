//! Process-level tests for the `ffmpegd` binary.

use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(contents.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Run the binary to completion and return its exit status.
async fn run_to_exit(config_path: &Path, work_dir: &Path) -> std::process::ExitStatus {
    timeout(
        Duration::from_secs(10),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_ffmpegd"))
            .env("FFMPEGD_CONFIG", config_path)
            .env("RUST_LOG", "error")
            .current_dir(work_dir)
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command")
    .status
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let work_dir = TempDir::new().unwrap();

    let status = run_to_exit(Path::new("/nonexistent/ffmpegd.toml"), work_dir.path()).await;

    assert!(!status.success());
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let work_dir = TempDir::new().unwrap();
    let config = write_config(
        r#"
[jobs]
progress_interval_ms = 0
"#,
    );

    let status = run_to_exit(config.path(), work_dir.path()).await;

    assert!(!status.success());
}

#[tokio::test]
async fn test_missing_ffmpeg_exits_with_error() {
    let work_dir = TempDir::new().unwrap();
    let config = write_config(&format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[tools]
ffmpeg_path = "/nonexistent/bin/ffmpeg"
ffprobe_path = "/nonexistent/bin/ffprobe"
"#,
        get_available_port()
    ));

    let status = run_to_exit(config.path(), work_dir.path()).await;

    assert!(!status.success());
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn fake_tool(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(
            &path,
            format!(
                "#!/bin/sh\necho '{} version 6.1.1 Copyright (c) 2000-2023 the FFmpeg developers'\n",
                name
            ),
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Wait for server to be ready
    async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
        let client = Client::new();
        for _ in 0..max_attempts {
            if client
                .get(format!("http://127.0.0.1:{}/api/v1/health", port))
                .send()
                .await
                .is_ok()
            {
                return true;
            }
            sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let tools = TempDir::new().unwrap();
        let ffmpeg = fake_tool(&tools, "ffmpeg");
        let ffprobe = fake_tool(&tools, "ffprobe");
        let port = get_available_port();

        let config = write_config(&format!(
            r#"
[server]
host = "127.0.0.1"
port = {}

[tools]
ffmpeg_path = "{}"
ffprobe_path = "{}"
"#,
            port,
            ffmpeg.display(),
            ffprobe.display()
        ));

        let mut server = tokio::process::Command::new(env!("CARGO_BIN_EXE_ffmpegd"))
            .env("FFMPEGD_CONFIG", config.path())
            .env("RUST_LOG", "error")
            .current_dir(tools.path())
            .kill_on_drop(true)
            .spawn()
            .expect("Failed to spawn server");

        assert!(
            wait_for_server(port, 100).await,
            "Server did not start in time"
        );

        let response = Client::new()
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());

        let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["versions"]["ffmpeg"], "6.1.1");
        assert_eq!(json["versions"]["ffprobe"], "6.1.1");

        server.kill().await.ok();
    }

    #[tokio::test]
    async fn test_env_overrides_port() {
        let tools = TempDir::new().unwrap();
        let ffmpeg = fake_tool(&tools, "ffmpeg");
        let ffprobe = fake_tool(&tools, "ffprobe");
        let port = get_available_port();

        let config = write_config(&format!(
            r#"
[server]
host = "127.0.0.1"
port = 1

[tools]
ffmpeg_path = "{}"
ffprobe_path = "{}"
"#,
            ffmpeg.display(),
            ffprobe.display()
        ));

        let mut server = tokio::process::Command::new(env!("CARGO_BIN_EXE_ffmpegd"))
            .env("FFMPEGD_CONFIG", config.path())
            .env("FFMPEGD_SERVER__PORT", port.to_string())
            .env("RUST_LOG", "error")
            .current_dir(tools.path())
            .kill_on_drop(true)
            .spawn()
            .expect("Failed to spawn server");

        assert!(
            wait_for_server(port, 100).await,
            "Server did not pick up the port override"
        );

        server.kill().await.ok();
    }
}
