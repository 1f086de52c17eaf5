//! Panel lifecycle: mount, observe, toggle, tear down

pub mod view;

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::core::controller::ToggleController;
use crate::core::state::{ConfigState, RunState};
use crate::gateway::Gateway;
use view::PluginDefinition;

/// Entry point registered with the host
pub struct Panel;

impl Panel {
    /// Mount the panel: fetch the configuration once and start reconciling.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(gateway: Arc<dyn Gateway>, config: &Config) -> PanelHandle {
        let (config_tx, config_rx) = watch::channel(ConfigState::Loading);

        let fetch_gateway = Arc::clone(&gateway);
        let config_task = tokio::spawn(async move {
            let state = match fetch_gateway.fetch_config().await {
                Ok(summary) => ConfigState::Loaded(summary),
                Err(e) => {
                    warn!(error = %e, "configuration unavailable");
                    ConfigState::Unavailable
                }
            };
            config_tx.send_replace(state);
        });

        let controller = ToggleController::start(gateway, config.poll_interval());
        info!("panel mounted");

        PanelHandle {
            controller,
            config: config_rx,
            config_task: Some(config_task),
            instructions_url: config.docs.instructions_url.clone(),
        }
    }
}

/// A mounted panel. Dropping it tears the panel down.
pub struct PanelHandle {
    controller: ToggleController,
    config: watch::Receiver<ConfigState>,
    config_task: Option<JoinHandle<()>>,
    instructions_url: String,
}

impl PanelHandle {
    pub fn believed_running(&self) -> bool {
        self.controller.believed_running()
    }

    pub fn state(&self) -> RunState {
        self.controller.state()
    }

    /// Observe belief updates
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.controller.subscribe()
    }

    /// Observe the configuration fetch
    pub fn subscribe_config(&self) -> watch::Receiver<ConfigState> {
        self.config.clone()
    }

    pub fn config(&self) -> ConfigState {
        self.config.borrow().clone()
    }

    /// User flipped the toggle
    pub fn toggle(&self) {
        self.controller.toggle();
    }

    pub fn is_mounted(&self) -> bool {
        self.controller.is_active()
    }

    /// Snapshot of what the host should render
    pub fn view(&self) -> PluginDefinition {
        view::build(self.state(), &self.config.borrow(), &self.instructions_url)
    }

    pub fn instructions_url(&self) -> &str {
        &self.instructions_url
    }

    /// Open the setup instructions in the default browser
    pub fn open_instructions(&self) {
        if let Err(e) = open::that(&self.instructions_url) {
            warn!("Failed to open {}: {}", self.instructions_url, e);
        }
    }

    /// Tear the panel down. No gateway call is issued afterwards. Idempotent.
    pub fn unmount(&mut self) {
        if let Some(task) = self.config_task.take() {
            task.abort();
            self.controller.stop();
            info!("panel unmounted");
        }
    }
}

impl Drop for PanelHandle {
    fn drop(&mut self) {
        self.unmount();
    }
}
