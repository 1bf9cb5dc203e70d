//! Common test utilities for HTTP testing with mocks.
//!
//! Builds the real router over an orchestrator wired to mock tools, with a
//! temporary directory standing in for both the files root and the static
//! UI directory.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

use ffmpegd_core::{
    testing::{MockEncoder, MockProber},
    Config, EncodeOrchestrator, SubscriberRegistry,
};
use ffmpegd_server::{create_router, AppState, ToolVersions};

/// Re-export fixtures for test convenience
pub use ffmpegd_core::testing::fixtures;

/// Test fixture serving the router in-process.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.get("/api/v1/health").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub orchestrator: Arc<EncodeOrchestrator>,
    pub prober: MockProber,
    pub encoder: MockEncoder,
    /// Files root and static directory; kept alive for the fixture's lifetime
    pub temp_dir: TempDir,
}

/// Response captured from the router.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    /// Parsed JSON body, `Value::Null` when the body is not JSON.
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a fixture with the default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a fixture after letting `customize` adjust the configuration.
    pub async fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        Self::with_encoder(MockEncoder::new(), customize).await
    }

    /// Create a fixture whose jobs run on `encoder`.
    pub async fn with_encoder(encoder: MockEncoder, customize: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.files.root = temp_dir.path().join("media");
        config.server.static_dir = temp_dir.path().join("ui");
        customize(&mut config);

        std::fs::create_dir_all(&config.files.root).expect("Failed to create files root");
        std::fs::create_dir_all(&config.server.static_dir).expect("Failed to create static dir");

        let prober = MockProber::new().with_result(fixtures::probe_with_frames(300));

        let orchestrator = Arc::new(EncodeOrchestrator::new(
            config.jobs.clone(),
            Arc::new(prober.clone()),
            Arc::new(encoder.clone()),
            Arc::new(SubscriberRegistry::new(Duration::from_millis(
                config.subscribers.send_timeout_ms,
            ))),
        ));
        orchestrator.start().await;

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&orchestrator),
            ToolVersions {
                ffmpeg: Some("6.1.1".to_string()),
                ffprobe: Some("6.1.1".to_string()),
            },
        ));
        let router = create_router(state);

        Self {
            router,
            orchestrator,
            prober,
            encoder,
            temp_dir,
        }
    }

    /// Serve the router on an ephemeral local port.
    pub async fn serve(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        addr
    }

    /// Write a file under the files root.
    pub fn media_file(&self, relative: &str, contents: &[u8]) {
        let path = self.temp_dir.path().join("media").join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(path, contents).expect("Failed to write media file");
    }

    /// Write a file under the static directory.
    pub fn static_file(&self, relative: &str, contents: &str) {
        std::fs::write(self.temp_dir.path().join("ui").join(relative), contents)
            .expect("Failed to write static file");
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.get_with_headers(path, &[]).await
    }

    /// Send a GET request with extra headers.
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }
}
