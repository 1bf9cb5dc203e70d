//! HTTP and websocket surface of the ffmpegd daemon.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::{AppState, ToolVersions};
