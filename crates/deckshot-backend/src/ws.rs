//! WebSocket server - plugin method calls
//!
//! Each text frame is a `MethodCall`; each gets exactly one `MethodReply`
//! echoing its sequence number. Calls on one connection are answered in order.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use deckshot_protocol::{MethodCall, MethodReply, PluginMethod};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::state::BackendState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<BackendState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: Arc<BackendState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    info!("Panel connected");

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = handle_call(text.as_str(), &state).await;
                let frame = match serde_json::to_string(&reply) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Failed to encode reply: {}", e);
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!("WS read error: {}", e);
                break;
            }
            _ => {} // Ignore binary/ping/pong
        }
    }

    info!("Panel disconnected");
}

/// Decode one call frame and run it
pub async fn handle_call(text: &str, state: &BackendState) -> MethodReply {
    let call: MethodCall = match serde_json::from_str(text) {
        Ok(call) => call,
        Err(e) => return MethodReply::failure(0, format!("invalid JSON: {}", e)),
    };

    let Some(method) = PluginMethod::from_name(&call.method) else {
        return MethodReply::failure(call.seq, format!("unknown method: {}", call.method));
    };

    debug!(seq = call.seq, %method, "method call");
    state.dispatch(method, call.seq).await
}
