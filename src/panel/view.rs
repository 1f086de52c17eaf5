//! Plugin view model: title, icon and content rows handed to the host

use serde::Serialize;
use std::fmt;

use crate::core::state::{ConfigState, RunState};

pub const PLUGIN_TITLE: &str = "Deckshot";
pub const SECTION_TITLE: &str = "Configuration";
pub const STATUS_LABEL: &str = "Deckshot status";
pub const UPLOADER_LABEL: &str = "Uploader";
pub const INSTRUCTIONS_LABEL: &str = "Open instructions";
pub const MANUAL_CONFIG_NOTE: &str = "Deckshot has to be configured manually for now, refer to the instructions from the repository for details.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    Camera,
}

impl Icon {
    pub fn glyph(&self) -> &'static str {
        match self {
            Icon::Camera => "📷",
        }
    }
}

/// One row of the panel section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Row {
    Toggle {
        label: String,
        description: String,
        checked: bool,
    },
    Note {
        text: String,
    },
    Link {
        label: String,
        url: String,
    },
    Field {
        label: String,
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelContent {
    pub section_title: String,
    pub rows: Vec<Row>,
}

/// What the plugin registers with the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDefinition {
    pub title: String,
    pub icon: Icon,
    pub content: PanelContent,
}

pub fn status_row(state: RunState) -> Row {
    Row::Toggle {
        label: STATUS_LABEL.to_string(),
        description: format!("Deckshot is {}", state.label()),
        checked: state.is_running(),
    }
}

pub fn uploader_row(config: &ConfigState) -> Row {
    Row::Field {
        label: UPLOADER_LABEL.to_string(),
        description: config.uploader_label().to_string(),
    }
}

/// Build the full plugin definition for the current state
pub fn build(state: RunState, config: &ConfigState, instructions_url: &str) -> PluginDefinition {
    PluginDefinition {
        title: PLUGIN_TITLE.to_string(),
        icon: Icon::Camera,
        content: PanelContent {
            section_title: SECTION_TITLE.to_string(),
            rows: vec![
                status_row(state),
                Row::Note {
                    text: MANUAL_CONFIG_NOTE.to_string(),
                },
                Row::Link {
                    label: INSTRUCTIONS_LABEL.to_string(),
                    url: instructions_url.to_string(),
                },
                uploader_row(config),
            ],
        },
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Row::Toggle {
                label,
                description,
                checked,
            } => {
                let mark = if *checked { "[x]" } else { "[ ]" };
                write!(f, "{} {}\n    {}", mark, label, description)
            }
            Row::Note { text } => write!(f, "{}", text),
            Row::Link { label, url } => write!(f, "<{}> {}", label, url),
            Row::Field { label, description } => write!(f, "{}: {}", label, description),
        }
    }
}

impl fmt::Display for PluginDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.icon.glyph(), self.title)?;
        writeln!(f, "── {} ──", self.content.section_title)?;
        for row in &self.content.rows {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
