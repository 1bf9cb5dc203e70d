use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ffmpegd_core::{
    load_config, load_default_config, validate_config, Config, EncodeOrchestrator, Encoder,
    FfmpegEncoder, FfprobeProber, Prober, SubscriberRegistry,
};
use ffmpegd_server::{create_router, AppState, ToolVersions};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file picked up from the working directory when present.
const DEFAULT_CONFIG_FILE: &str = "ffmpegd.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("ffmpegd {} starting", VERSION);

    let config = resolve_config()?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("ffmpeg: {:?}", config.tools.ffmpeg_path);
    info!("ffprobe: {:?}", config.tools.ffprobe_path);
    info!("Busy policy: {:?}", config.jobs.when_busy);

    let prober: Arc<dyn Prober> = Arc::new(FfprobeProber::from_config(&config.tools));
    let encoder: Arc<dyn Encoder> = Arc::new(FfmpegEncoder::from_config(&config.tools));

    // Both tools must be runnable before we accept connections
    let tool_versions = ToolVersions {
        ffprobe: prober
            .version()
            .await
            .context("ffprobe is not available")?,
        ffmpeg: encoder
            .version()
            .await
            .context("ffmpeg is not available")?,
    };
    match (&tool_versions.ffmpeg, &tool_versions.ffprobe) {
        (Some(ffmpeg), Some(ffprobe)) => {
            info!("Found ffmpeg {} and ffprobe {}", ffmpeg, ffprobe)
        }
        _ => warn!("Could not read tool versions: {:?}", tool_versions),
    }

    let registry = Arc::new(SubscriberRegistry::new(Duration::from_millis(
        config.subscribers.send_timeout_ms,
    )));
    let orchestrator = Arc::new(EncodeOrchestrator::new(
        config.jobs.clone(),
        prober,
        encoder,
        registry,
    ));
    orchestrator.start().await;
    info!("Encode orchestrator started");

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(
        config,
        Arc::clone(&orchestrator),
        tool_versions,
    ));
    info!("Allowed origins: {:?}", state.allowed_origins());

    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stopping orchestrator...");
    orchestrator.stop().await;
    info!("Server shut down");

    Ok(())
}

/// `FFMPEGD_CONFIG` if set (the file must exist), else `ffmpegd.toml` in the
/// working directory if present, else built-in defaults. Environment
/// overrides apply in every case.
fn resolve_config() -> Result<Config> {
    if let Ok(path) = std::env::var("FFMPEGD_CONFIG") {
        let path = PathBuf::from(path);
        info!("Loading configuration from {:?}", path);
        return load_config(&path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        info!("Loading configuration from {:?}", default_path);
        return load_config(default_path)
            .with_context(|| format!("Failed to load config from {:?}", default_path));
    }

    info!("No config file found, using defaults");
    load_default_config().context("Failed to load default config")
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
