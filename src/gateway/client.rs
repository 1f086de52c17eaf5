//! WebSocket client for the Deckshot plugin backend.
//!
//! One background task owns the socket and reconnects with backoff. Calls are
//! JSON text frames correlated with their replies by sequence number.

use deckshot_protocol::{ConfigSummary, MethodCall, MethodReply, PluginMethod};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{decode_config, decode_running, CallResult, Gateway, RemoteCallFailure};

type PendingMap = Arc<Mutex<HashMap<u32, oneshot::Sender<MethodReply>>>>;

const INITIAL_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 5000;
/// Upper bound on waiting for a single reply
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Gateway that talks to the backend's `/ws` endpoint.
pub struct WsGateway {
    /// Outgoing text frames
    ws_tx: mpsc::UnboundedSender<String>,
    /// Sequence counter for request-response correlation (wraps, skips 0)
    seq: AtomicU32,
    /// Pending replies keyed by sequence number
    pending: PendingMap,
    /// Whether the WS connection is alive
    connected: watch::Receiver<bool>,
    /// Connection task, aborted on drop
    task: JoinHandle<()>,
}

impl WsGateway {
    /// Start connecting to the backend at `addr` (`host:port`).
    ///
    /// Returns immediately; calls made before the connection is up fail.
    /// Must be called from within a tokio runtime.
    pub fn connect(addr: &str) -> Self {
        let url = format!("ws://{}/ws", addr);

        let (ws_tx, ws_rx) = mpsc::unbounded_channel::<String>();
        let (connected_tx, connected) = watch::channel(false);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let task = tokio::spawn(run_ws_loop(url, ws_rx, connected_tx, Arc::clone(&pending)));

        Self {
            ws_tx,
            seq: AtomicU32::new(1),
            pending,
            connected,
            task,
        }
    }

    /// Whether the backend connection is alive.
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Wait until the connection is up, at most `timeout`.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut rx = self.connected.clone();
        let connected = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|connected| *connected)).await,
            Ok(Ok(_))
        );
        connected
    }

    /// Allocate the next non-zero sequence number.
    fn next_seq(&self) -> u32 {
        loop {
            let s = self.seq.fetch_add(1, Ordering::Relaxed);
            if s != 0 {
                return s;
            }
        }
    }

    /// Invoke `method` and wait for its reply.
    async fn call(&self, method: PluginMethod) -> CallResult<Value> {
        if !self.is_connected() {
            return Err(RemoteCallFailure::new(method, "backend not connected"));
        }

        let seq = self.next_seq();
        let frame = serde_json::to_string(&MethodCall::new(seq, method))
            .map_err(|e| RemoteCallFailure::new(method, e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(seq, tx);

        if self.ws_tx.send(frame).is_err() {
            self.pending.lock().remove(&seq);
            return Err(RemoteCallFailure::new(method, "backend connection closed"));
        }

        match tokio::time::timeout(REPLY_TIMEOUT, rx).await {
            Ok(Ok(reply)) => reply
                .into_result()
                .map_err(|reason| RemoteCallFailure::new(method, reason)),
            Ok(Err(_)) => Err(RemoteCallFailure::new(method, "connection lost before reply")),
            Err(_) => {
                self.pending.lock().remove(&seq);
                Err(RemoteCallFailure::new(method, "timed out waiting for reply"))
            }
        }
    }
}

impl Drop for WsGateway {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait::async_trait]
impl Gateway for WsGateway {
    async fn query_running(&self) -> CallResult<bool> {
        decode_running(self.call(PluginMethod::IsRunning).await?)
    }

    async fn request_toggle(&self) -> CallResult<()> {
        self.call(PluginMethod::Toggle).await.map(|_| ())
    }

    async fn fetch_config(&self) -> CallResult<Option<ConfigSummary>> {
        decode_config(self.call(PluginMethod::GetConfig).await?)
    }
}

// ── Background WebSocket loop ────────────────────────────────────────

async fn run_ws_loop(
    url: String,
    mut outgoing_rx: mpsc::UnboundedReceiver<String>,
    connected: watch::Sender<bool>,
    pending: PendingMap,
) {
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        debug!("Connecting to backend at {}...", url);

        match tokio_tungstenite::connect_async(&url).await {
            Ok((ws_stream, _)) => {
                info!("Connected to backend");
                // Anything queued before this connection went live is stale
                fail_in_flight(&mut outgoing_rx, &pending);
                connected.send_replace(true);
                backoff_ms = INITIAL_BACKOFF_MS;

                let (mut ws_sink, mut ws_stream_rx) = ws_stream.split();

                loop {
                    tokio::select! {
                        outgoing = outgoing_rx.recv() => match outgoing {
                            Some(frame) => {
                                if let Err(e) = ws_sink.send(Message::Text(frame.into())).await {
                                    warn!("WS write error: {}", e);
                                    break;
                                }
                            }
                            // Gateway dropped
                            None => return,
                        },
                        incoming = ws_stream_rx.next() => match incoming {
                            Some(Ok(Message::Text(text))) => handle_reply(text.as_str(), &pending),
                            Some(Ok(Message::Close(_))) => {
                                info!("Backend closed WS connection");
                                break;
                            }
                            Some(Ok(_)) => {} // Ignore binary/ping/pong
                            Some(Err(e)) => {
                                warn!("WS read error: {}", e);
                                break;
                            }
                            None => {
                                info!("WS stream ended");
                                break;
                            }
                        },
                    }
                }

                connected.send_replace(false);
                fail_in_flight(&mut outgoing_rx, &pending);
            }
            Err(e) => {
                debug!("Failed to connect to backend: {} (retry in {}ms)", e, backoff_ms);
            }
        }

        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        backoff_ms = next_backoff(backoff_ms);
    }
}

fn next_backoff(current_ms: u64) -> u64 {
    (current_ms * 3 / 2).min(MAX_BACKOFF_MS)
}

/// Drop queued frames and pending replies around a connection change.
///
/// Queued toggles must not be replayed on the next connection, and waiting
/// callers get a failure instead of hanging.
fn fail_in_flight(outgoing_rx: &mut mpsc::UnboundedReceiver<String>, pending: &PendingMap) {
    while outgoing_rx.try_recv().is_ok() {}
    pending.lock().clear();
}

/// Route a reply frame to its waiting caller.
fn handle_reply(text: &str, pending: &PendingMap) {
    let reply: MethodReply = match serde_json::from_str(text) {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Malformed reply from backend: {}", e);
            return;
        }
    };

    if let Some(sender) = pending.lock().remove(&reply.seq) {
        let _ = sender.send(reply);
    } else {
        debug!("No pending request for seq={}", reply.seq);
    }
}
