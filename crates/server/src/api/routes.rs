use axum::{http::HeaderValue, middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use super::{files, handlers, middleware::metrics_middleware, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config().server.static_dir.clone();

    // API routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .with_state(state.clone());

    // Directory listing is called cross-origin by hosted UIs
    let files_routes = Router::new()
        .route("/files", get(files::list_files))
        .layer(cors_layer(state.allowed_origins()))
        .with_state(state.clone());

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .merge(files_routes)
        .nest("/api/v1", api_routes)
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring allowed origin that is not a valid header value");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
}
