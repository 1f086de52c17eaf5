//! Backend shared state

use deckshot_protocol::{ConfigSummary, MethodReply, PluginMethod};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use crate::supervisor::Supervisor;

/// Shared across connections (must be Send + Sync for axum)
pub struct BackendState {
    /// The one supervised daemon; held across process waits
    pub supervisor: Mutex<Supervisor>,
}

impl BackendState {
    pub fn new(supervisor: Supervisor) -> Self {
        Self {
            supervisor: Mutex::new(supervisor),
        }
    }

    /// Run one plugin method and wrap the outcome in a reply
    pub async fn dispatch(&self, method: PluginMethod, seq: u32) -> MethodReply {
        let mut supervisor = self.supervisor.lock().await;

        match method {
            PluginMethod::IsRunning => MethodReply::ok(seq, Value::Bool(supervisor.is_running())),
            PluginMethod::Toggle => match supervisor.toggle().await {
                Ok(_) => MethodReply::ok_empty(seq),
                Err(e) => {
                    warn!("toggle failed: {}", e);
                    MethodReply::failure(seq, e.to_string())
                }
            },
            PluginMethod::GetConfig => match supervisor.config().read_summary() {
                Ok(summary) => MethodReply::ok(seq, summary_value(summary)),
                Err(e) => {
                    warn!("reading configuration failed: {}", e);
                    MethodReply::failure(seq, e.to_string())
                }
            },
        }
    }
}

fn summary_value(summary: Option<ConfigSummary>) -> Value {
    match summary {
        Some(ConfigSummary(map)) => Value::Object(map),
        None => Value::Null,
    }
}
