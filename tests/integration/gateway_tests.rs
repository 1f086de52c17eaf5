//! WebSocket gateway tests against an in-process backend

use deckshot_panel::{Config, Gateway, Panel, WsGateway};
use deckshot_protocol::{MethodCall, MethodReply, PluginMethod};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How the fake backend answers
#[derive(Clone, Copy)]
enum Behavior {
    /// Behaves like the real backend
    Healthy,
    /// Every call fails
    Failing,
    /// Reads one call, then hangs up without replying
    HangUp,
}

/// Start a fake backend; returns its address and the simulated run state
async fn spawn_backend(behavior: Behavior, config: Value) -> (String, Arc<AtomicBool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let running = Arc::new(AtomicBool::new(false));

    let state = Arc::clone(&running);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let state = Arc::clone(&state);
            let config = config.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else { continue };
                    let call: MethodCall = serde_json::from_str(text.as_str()).unwrap();

                    let reply = match behavior {
                        Behavior::HangUp => return,
                        Behavior::Failing => MethodReply::failure(call.seq, "daemon unreachable"),
                        Behavior::Healthy => match PluginMethod::from_name(&call.method) {
                            Some(PluginMethod::IsRunning) => {
                                MethodReply::ok(call.seq, json!(state.load(Ordering::SeqCst)))
                            }
                            Some(PluginMethod::Toggle) => {
                                state.fetch_xor(true, Ordering::SeqCst);
                                MethodReply::ok_empty(call.seq)
                            }
                            Some(PluginMethod::GetConfig) => MethodReply::ok(call.seq, config.clone()),
                            None => MethodReply::failure(call.seq, "unknown method"),
                        },
                    };

                    let frame = serde_json::to_string(&reply).unwrap();
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    (addr, running)
}

async fn connected_gateway(addr: &str) -> WsGateway {
    let gateway = WsGateway::connect(addr);
    assert!(gateway.wait_connected(CONNECT_TIMEOUT).await);
    gateway
}

#[tokio::test]
async fn test_query_and_toggle() {
    let (addr, running) = spawn_backend(Behavior::Healthy, Value::Null).await;
    let gateway = connected_gateway(&addr).await;

    assert_eq!(gateway.query_running().await, Ok(false));
    assert_eq!(gateway.request_toggle().await, Ok(()));
    assert!(running.load(Ordering::SeqCst));
    assert_eq!(gateway.query_running().await, Ok(true));
}

#[tokio::test]
async fn test_fetch_config() {
    let config = json!({ "uploader": { "kind": "ftp", "host": "nas.local" }, "enabled": true });
    let (addr, _) = spawn_backend(Behavior::Healthy, config).await;
    let gateway = connected_gateway(&addr).await;

    let summary = gateway.fetch_config().await.unwrap().unwrap();
    assert_eq!(summary.uploader_kind(), Some("ftp"));
}

#[tokio::test]
async fn test_fetch_absent_config() {
    let (addr, _) = spawn_backend(Behavior::Healthy, Value::Null).await;
    let gateway = connected_gateway(&addr).await;

    assert_eq!(gateway.fetch_config().await, Ok(None));
}

#[tokio::test]
async fn test_malformed_config_is_a_failure() {
    let (addr, _) = spawn_backend(Behavior::Healthy, json!("not a mapping")).await;
    let gateway = connected_gateway(&addr).await;

    let err = gateway.fetch_config().await.unwrap_err();
    assert_eq!(err.method, PluginMethod::GetConfig);
}

#[tokio::test]
async fn test_failure_replies_are_tagged() {
    let (addr, _) = spawn_backend(Behavior::Failing, Value::Null).await;
    let gateway = connected_gateway(&addr).await;

    let err = gateway.query_running().await.unwrap_err();
    assert_eq!(err.method, PluginMethod::IsRunning);
    assert_eq!(err.reason, "daemon unreachable");
    assert!(gateway.request_toggle().await.is_err());
}

#[tokio::test]
async fn test_hang_up_fails_pending_call() {
    let (addr, _) = spawn_backend(Behavior::HangUp, Value::Null).await;
    let gateway = connected_gateway(&addr).await;

    let result = tokio::time::timeout(CONNECT_TIMEOUT, gateway.query_running()).await;
    assert!(matches!(result, Ok(Err(_))));
}

#[tokio::test]
async fn test_unreachable_backend() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let gateway = WsGateway::connect(&addr);
    assert!(!gateway.wait_connected(Duration::from_millis(300)).await);
    assert!(gateway.query_running().await.is_err());
}

#[tokio::test]
async fn test_panel_converges_over_websocket() {
    let (addr, running) = spawn_backend(Behavior::Healthy, json!({ "uploader": { "kind": "s3" } })).await;
    let gateway: Arc<dyn Gateway> = Arc::new(connected_gateway(&addr).await);

    let mut config = Config::default();
    config.poll.interval_ms = 100;
    let mut panel = Panel::mount(gateway, &config);

    panel.toggle();
    assert!(panel.believed_running());

    for _ in 0..100 {
        if running.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(running.load(Ordering::SeqCst));

    let mut rx = panel.subscribe();
    running.store(false, Ordering::SeqCst);
    assert!(matches!(
        tokio::time::timeout(CONNECT_TIMEOUT, rx.wait_for(|state| !state.is_running())).await,
        Ok(Ok(_))
    ));

    running.store(true, Ordering::SeqCst);
    assert!(matches!(
        tokio::time::timeout(CONNECT_TIMEOUT, rx.wait_for(|state| state.is_running())).await,
        Ok(Ok(_))
    ));

    panel.unmount();
}
