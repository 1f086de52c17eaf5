//! Shared types and wire format for Deckshot panel ↔ backend communication.
//!
//! This crate is intentionally lightweight (only `serde` + `serde_json`).
//! It defines:
//! - The plugin method names understood by the backend
//! - The method-call envelope (`MethodCall` / `MethodReply`) sent as JSON text
//!   frames over the backend WebSocket
//! - The configuration summary shown by the panel
//! - HTTP REST response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Plugin methods ─────────────────────────────────────────────────

/// Operations the backend exposes through the method-call interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginMethod {
    /// `is_running`: no args, result is a bool
    IsRunning,
    /// `toggle`: no args, no meaningful result
    Toggle,
    /// `get_config`: no args, result is a config summary or null
    GetConfig,
}

impl PluginMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginMethod::IsRunning => "is_running",
            PluginMethod::Toggle => "toggle",
            PluginMethod::GetConfig => "get_config",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "is_running" => Some(PluginMethod::IsRunning),
            "toggle" => Some(PluginMethod::Toggle),
            "get_config" => Some(PluginMethod::GetConfig),
            _ => None,
        }
    }
}

impl std::fmt::Display for PluginMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Method-call envelope ───────────────────────────────────────────
//
// Every WS text frame is one JSON object.
// Panel→Backend: MethodCall { seq, method, args }
// Backend→Panel: MethodReply { seq, success, result?, error? }
// seq is chosen by the caller (non-zero) and echoed in the reply.

/// A single method invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    pub seq: u32,
    pub method: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

fn empty_args() -> Value {
    Value::Object(Map::new())
}

impl MethodCall {
    pub fn new(seq: u32, method: PluginMethod) -> Self {
        Self {
            seq,
            method: method.as_str().to_string(),
            args: empty_args(),
        }
    }
}

/// Tagged result of a method invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodReply {
    pub seq: u32,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MethodReply {
    pub fn ok(seq: u32, result: Value) -> Self {
        Self {
            seq,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Success without a meaningful payload (e.g. `toggle`)
    pub fn ok_empty(seq: u32) -> Self {
        Self {
            seq,
            success: true,
            result: None,
            error: None,
        }
    }

    pub fn failure(seq: u32, error: impl Into<String>) -> Self {
        Self {
            seq,
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Collapse the tag into a `Result`. A successful reply without a result
    /// yields `Value::Null`.
    pub fn into_result(self) -> Result<Value, String> {
        if self.success {
            Ok(self.result.unwrap_or(Value::Null))
        } else {
            Err(self.error.unwrap_or_else(|| "call failed".to_string()))
        }
    }
}

// ── Configuration summary ──────────────────────────────────────────

/// Read-only view of the daemon configuration.
///
/// Open-ended: whatever keys the configuration file holds are kept. The panel
/// only reads `uploader.kind`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSummary(pub Map<String, Value>);

impl ConfigSummary {
    /// Uploader backend identifier, e.g. `"s3"`
    pub fn uploader_kind(&self) -> Option<&str> {
        self.0.get("uploader")?.get("kind")?.as_str()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

// ── HTTP REST types ────────────────────────────────────────────────

/// Default backend listen address
pub const DEFAULT_BACKEND_ADDR: &str = "127.0.0.1:19385";

/// Response for GET /api/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Whether the daemon child process is alive
    pub running: bool,
    /// Whether the configuration asks for the daemon to run
    #[serde(default)]
    pub enabled: bool,
    /// Location of the daemon configuration file
    pub config_path: String,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
