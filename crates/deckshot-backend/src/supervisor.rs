//! Deckshot daemon process supervision
//!
//! Exactly one child process, identified by the binary it was spawned from.
//! Running means "spawned by us and not exited yet".

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::DaemonConfigFile;
use crate::error::BackendError;

/// How long the daemon gets to exit after SIGTERM before it is killed
const STOP_GRACE: Duration = Duration::from_secs(5);

pub struct Supervisor {
    daemon_bin: PathBuf,
    config: DaemonConfigFile,
    child: Option<Child>,
    stop_grace: Duration,
}

impl Supervisor {
    pub fn new(daemon_bin: impl Into<PathBuf>, config: DaemonConfigFile) -> Self {
        Self {
            daemon_bin: daemon_bin.into(),
            config,
            child: None,
            stop_grace: STOP_GRACE,
        }
    }

    pub fn config(&self) -> &DaemonConfigFile {
        &self.config
    }

    pub fn daemon_bin(&self) -> &Path {
        &self.daemon_bin
    }

    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            None => false,
            Some(child) => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    warn!("deckshot exited on its own ({})", status);
                    self.child = None;
                    false
                }
                Err(e) => {
                    warn!("Failed to query deckshot process: {}", e);
                    false
                }
            },
        }
    }

    /// Spawn the daemon unless it is already running
    pub fn start(&mut self) -> Result<(), BackendError> {
        if self.is_running() {
            return Ok(());
        }

        info!("starting deckshot");
        let child = Command::new(&self.daemon_bin)
            .arg("-c")
            .arg(self.config.path())
            .kill_on_drop(true)
            .spawn()?;
        self.child = Some(child);
        Ok(())
    }

    /// Ask the daemon to exit and reap it; kill it if it outlives the grace period
    pub async fn stop(&mut self) -> Result<(), BackendError> {
        if self.is_running() {
            info!("stopping deckshot");
            if let Some(child) = self.child.as_mut() {
                terminate(child)?;
                match tokio::time::timeout(self.stop_grace, child.wait()).await {
                    Ok(status) => {
                        status?;
                    }
                    Err(_) => {
                        warn!("deckshot ignored SIGTERM, killing it");
                        child.start_kill()?;
                        child.wait().await?;
                    }
                }
            }
        }
        self.child = None;
        Ok(())
    }

    /// Persist the inverted run state as `enabled`, then apply it.
    /// Returns whether the daemon should now be running.
    pub async fn toggle(&mut self) -> Result<bool, BackendError> {
        let enable = !self.is_running();
        self.config.set_enabled(enable)?;

        if enable {
            self.start()?;
        } else {
            self.stop().await?;
        }
        Ok(enable)
    }

    /// Start the daemon if the configuration allows it
    pub fn start_if_enabled(&mut self) -> Result<bool, BackendError> {
        if !self.config.is_enabled()? {
            info!("deckshot not configured or disabled, not starting");
            return Ok(false);
        }
        self.start()?;
        Ok(true)
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) -> Result<(), BackendError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
            .map_err(|errno| BackendError::Io(errno.into())),
        // Already reaped
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> Result<(), BackendError> {
    child.start_kill()?;
    Ok(())
}
