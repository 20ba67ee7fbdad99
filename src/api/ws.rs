use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use super::state::AppState;
use crate::hub::{BroadcastHub, DeliveryError, SubscriberSink};

/// Outbound half of one WebSocket, shared by the hub and the reply path.
struct WsSink {
    inner: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl SubscriberSink for WsSink {
    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        let mut sink = self.inner.lock().await;
        sink.send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|err| DeliveryError::Transport(err.to_string()))
    }
}

/// GET /ws: upgrade and subscribe to progress events.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let hub = Arc::clone(state.hub());
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (sink, mut stream) = socket.split();
    let sink = Arc::new(WsSink {
        inner: Mutex::new(sink),
    });

    let handle = match hub.subscribe(sink.clone()).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(error = %err, "WebSocket closed before subscription");
            return;
        }
    };

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) if text.as_str() == "ping" => {
                if let Err(err) = sink.send_text("pong").await {
                    debug!(subscriber = %handle, error = %err, "Pong failed");
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                trace!(subscriber = %handle, "Ignoring inbound frame");
            }
            Err(err) => {
                debug!(subscriber = %handle, error = %err, "WebSocket receive error");
                break;
            }
        }
    }

    hub.unsubscribe(handle);
    info!(subscriber = %handle, "WebSocket closed");
}
