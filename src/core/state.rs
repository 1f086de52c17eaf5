//! Panel state: believed run state and configuration load state

use deckshot_protocol::ConfigSummary;
use serde::{Deserialize, Serialize};

/// Placeholder shown wherever a configuration value is not available
pub const NOT_AVAILABLE: &str = "N/A";

/// Run state of the Deckshot daemon as last observed (or optimistically assumed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

impl RunState {
    pub fn from_running(running: bool) -> Self {
        if running {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }

    /// The opposite state
    pub fn toggled(&self) -> Self {
        match self {
            RunState::Stopped => RunState::Running,
            RunState::Running => RunState::Stopped,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunState::Stopped => "stopped",
            RunState::Running => "running",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the one-shot configuration fetch done at mount
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConfigState {
    /// Fetch not resolved yet
    #[default]
    Loading,
    /// Backend answered; `None` means the daemon has no configuration
    Loaded(Option<ConfigSummary>),
    /// Fetch failed
    Unavailable,
}

impl ConfigState {
    pub fn summary(&self) -> Option<&ConfigSummary> {
        match self {
            ConfigState::Loaded(summary) => summary.as_ref(),
            _ => None,
        }
    }

    /// Uploader kind, or the placeholder when there is nothing to show
    pub fn uploader_label(&self) -> &str {
        self.summary()
            .and_then(ConfigSummary::uploader_kind)
            .unwrap_or(NOT_AVAILABLE)
    }
}
