//! WebSocket endpoint: encode requests in, status events out.
//!
//! Every connection is registered as a subscriber for as long as it stays
//! open, so it receives the progress of every job, not just its own.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ffmpegd_core::{
    EncodeRequest, StatusEvent, SubmitOutcome, Subscriber, SubscriberId, SubscriberWriteError,
};

use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_RECEIVED, WS_ORIGIN_REJECTIONS,
};
use crate::state::AppState;

/// Message type that starts an encode.
const ENCODE_MESSAGE: &str = "encode";

/// Message sent by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    /// Either the ConfigDocument JSON as a string or the object itself.
    #[serde(default)]
    pub payload: Value,
}

impl ClientMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn into_request(self) -> EncodeRequest {
        let payload = match self.payload {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        EncodeRequest {
            input: self.input.into(),
            output: self.output.into(),
            payload,
        }
    }
}

/// Subscriber writing status events to a websocket as JSON text frames.
struct WsSubscriber {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl Subscriber for WsSubscriber {
    async fn send(&self, event: &StatusEvent) -> Result<(), SubscriberWriteError> {
        let json =
            serde_json::to_string(event).map_err(|e| SubscriberWriteError::Write(e.to_string()))?;
        self.sink
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| SubscriberWriteError::Write(e.to_string()))
    }

    async fn close(&self) {
        let _ = self.sink.lock().await.close().await;
    }
}

/// WebSocket upgrade handler.
///
/// The Origin check runs before the upgrade is attempted; requests without an
/// Origin header (non-browser clients) are let through.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if let Some(origin) = headers.get(header::ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|o| state.origin_allowed(o))
            .unwrap_or(false);
        if !allowed {
            WS_ORIGIN_REJECTIONS.inc();
            warn!(origin = ?origin, "Rejected WebSocket upgrade from disallowed origin");
            return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
        }
    }

    match ws {
        Ok(ws) => ws.on_upgrade(|socket| handle_socket(socket, state)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();

    let registry = state.orchestrator().registry();
    let id = registry
        .register(Arc::new(WsSubscriber {
            sink: Mutex::new(sender),
        }))
        .await;

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!(subscriber_id = id, "WebSocket client connected");

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => handle_text(&state, id, text.as_str()).await,
            Ok(Message::Close(_)) => {
                debug!(subscriber_id = id, "WebSocket client requested close");
                break;
            }
            Ok(Message::Binary(_)) => {
                debug!(subscriber_id = id, "Ignoring binary message");
            }
            Ok(_) => {
                // Pong is handled automatically by axum
            }
            Err(e) => {
                warn!(subscriber_id = id, "WebSocket receive error: {}", e);
                break;
            }
        }
    }

    registry.remove(id).await;
    WS_CONNECTIONS_ACTIVE.dec();
    info!(subscriber_id = id, "WebSocket client disconnected");
}

async fn handle_text(state: &AppState, id: SubscriberId, text: &str) {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            WS_MESSAGES_RECEIVED.with_label_values(&["malformed"]).inc();
            warn!(subscriber_id = id, error = %e, "Ignoring malformed client message");
            return;
        }
    };

    if message.kind != ENCODE_MESSAGE {
        WS_MESSAGES_RECEIVED.with_label_values(&["other"]).inc();
        debug!(subscriber_id = id, kind = %message.kind, "Ignoring client message");
        return;
    }
    WS_MESSAGES_RECEIVED
        .with_label_values(&[ENCODE_MESSAGE])
        .inc();

    let request = message.into_request();
    info!(
        subscriber_id = id,
        input = %request.input.display(),
        output = %request.output.display(),
        "Encode requested"
    );

    let orchestrator = state.orchestrator();
    match orchestrator.submit(Some(id), request).await {
        Ok(SubmitOutcome::Queued { job_id, ahead }) => {
            debug!(subscriber_id = id, %job_id, ahead, "Encode queued");
        }
        Ok(SubmitOutcome::Rejected) => {
            debug!(subscriber_id = id, "Encode rejected while busy");
        }
        Err(e) => {
            warn!(subscriber_id = id, error = %e, "Encode not accepted");
            orchestrator
                .registry()
                .send_to(id, &StatusEvent::failed(e.to_string()))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_string_payload_is_passed_through() {
        let text = r#"{"type":"encode","input":"in.mov","output":"out.mp4","payload":"{\"format\":{\"container\":\"mp4\"}}"}"#;
        let request = ClientMessage::parse(text).unwrap().into_request();

        assert_eq!(request.input, PathBuf::from("in.mov"));
        assert_eq!(request.output, PathBuf::from("out.mp4"));
        assert_eq!(request.payload, r#"{"format":{"container":"mp4"}}"#);
    }

    #[test]
    fn test_object_payload_is_serialized() {
        let text = r#"{"type":"encode","input":"a","output":"b","payload":{"format":{"container":"mkv"}}}"#;
        let request = ClientMessage::parse(text).unwrap().into_request();

        let value: Value = serde_json::from_str(&request.payload).unwrap();
        assert_eq!(value["format"]["container"], "mkv");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let message = ClientMessage::parse(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(message.kind, "ping");

        let request = message.into_request();
        assert_eq!(request.payload, "");
        assert_eq!(request.input, PathBuf::new());
    }

    #[test]
    fn test_message_without_type_is_malformed() {
        assert!(ClientMessage::parse(r#"{"input":"a"}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
    }
}
