//! Remote control gateway - the only channel to the Deckshot backend
//!
//! Three operations, each of which reports a definite success or failure and
//! never panics or blocks forever on a dead connection.

mod client;
mod mock;

pub use client::WsGateway;
pub use mock::MockGateway;

use async_trait::async_trait;
use deckshot_protocol::{ConfigSummary, PluginMethod};
use serde_json::Value;

/// A gateway call whose success tag was false.
///
/// Unreachable backend, backend-side error and malformed reply all end up
/// here; `reason` is kept for logging only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{method} call failed: {reason}")]
pub struct RemoteCallFailure {
    pub method: PluginMethod,
    pub reason: String,
}

impl RemoteCallFailure {
    pub fn new(method: PluginMethod, reason: impl Into<String>) -> Self {
        Self {
            method,
            reason: reason.into(),
        }
    }
}

pub type CallResult<T> = std::result::Result<T, RemoteCallFailure>;

/// Capability to observe and flip the daemon's run state.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Current run state of the daemon
    async fn query_running(&self) -> CallResult<bool>;

    /// Ask the daemon to flip its run state. Success does not carry the new
    /// state; re-query to learn it.
    async fn request_toggle(&self) -> CallResult<()>;

    /// Daemon configuration, `None` when it was never configured
    async fn fetch_config(&self) -> CallResult<Option<ConfigSummary>>;
}

/// Interpret an `is_running` result payload
pub(crate) fn decode_running(value: Value) -> CallResult<bool> {
    value.as_bool().ok_or_else(|| {
        RemoteCallFailure::new(PluginMethod::IsRunning, format!("expected a bool, got {}", value))
    })
}

/// Interpret a `get_config` result payload
pub(crate) fn decode_config(value: Value) -> CallResult<Option<ConfigSummary>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(ConfigSummary(map))),
        other => Err(RemoteCallFailure::new(
            PluginMethod::GetConfig,
            format!("expected a mapping, got {}", other),
        )),
    }
}
