//! Daemon configuration file
//!
//! The file belongs to the Deckshot daemon; the backend only creates it from a
//! template, reads it for the panel and flips its `enabled` key.

use deckshot_protocol::ConfigSummary;
use directories::BaseDirs;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::BackendError;

/// Template written when no configuration exists yet
pub const DEFAULT_CONFIG: &str = "\
# Deckshot configuration, see https://github.com/apognu/deckshot#readme
enabled: true
uploader:
  kind: noop
";

const ENABLED_KEY: &str = "enabled";

/// Handle on the daemon's YAML configuration file
#[derive(Debug, Clone)]
pub struct DaemonConfigFile {
    path: PathBuf,
}

impl DaemonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/deckshot/deckshot.yml`
    pub fn default_path() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.config_dir().join("deckshot").join("deckshot.yml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory and write the template if the file is missing.
    /// Returns whether the file was created.
    pub fn ensure_exists(&self) -> Result<bool, BackendError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if self.path.exists() {
            return Ok(false);
        }

        std::fs::write(&self.path, DEFAULT_CONFIG)?;
        restrict_permissions(&self.path)?;
        Ok(true)
    }

    /// Configuration as shown to the panel, `None` for an empty file
    pub fn read_summary(&self) -> Result<Option<ConfigSummary>, BackendError> {
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        match serde_yaml::from_str::<Value>(&content)? {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(ConfigSummary(map))),
            _ => Err(BackendError::NotAMapping(self.path.clone())),
        }
    }

    /// Whether the daemon should run.
    ///
    /// An unconfigured (empty) file means no; in a configured file a missing
    /// `enabled` key means yes.
    pub fn is_enabled(&self) -> Result<bool, BackendError> {
        Ok(match self.read_summary()? {
            None => false,
            Some(summary) => summary
                .get(ENABLED_KEY)
                .and_then(Value::as_bool)
                .unwrap_or(true),
        })
    }

    /// Persist the `enabled` key, keeping everything else in the file
    pub fn set_enabled(&self, enabled: bool) -> Result<(), BackendError> {
        let mut mapping = self.read_mapping()?;
        mapping.insert(
            serde_yaml::Value::String(ENABLED_KEY.to_string()),
            serde_yaml::Value::Bool(enabled),
        );

        std::fs::write(&self.path, serde_yaml::to_string(&mapping)?)?;
        Ok(())
    }

    fn read_mapping(&self) -> Result<serde_yaml::Mapping, BackendError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(serde_yaml::Mapping::new());
        }

        match serde_yaml::from_str::<serde_yaml::Value>(&content)? {
            serde_yaml::Value::Mapping(mapping) => Ok(mapping),
            serde_yaml::Value::Null => Ok(serde_yaml::Mapping::new()),
            _ => Err(BackendError::NotAMapping(self.path.clone())),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), BackendError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), BackendError> {
    Ok(())
}
