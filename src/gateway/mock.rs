//! In-memory gateway simulating the Deckshot daemon.
//!
//! Backs the `--mock` CLI flag (panel without a backend) and the tests.
//! Scripted answers are consumed first; once a script runs out the simulated
//! daemon answers from its own state.

use deckshot_protocol::{ConfigSummary, PluginMethod};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use super::{CallResult, Gateway, RemoteCallFailure};

#[derive(Debug, Default)]
struct MockState {
    running: bool,
    /// Whether a successful toggle request actually flips `running`
    toggle_applies: bool,
    config: Option<CallResult<Option<ConfigSummary>>>,
    /// `None` entries are failed calls
    queries: VecDeque<Option<bool>>,
    toggles: VecDeque<bool>,
    query_calls: usize,
    toggle_calls: usize,
    config_calls: usize,
}

/// Simulated daemon behind the [`Gateway`] contract
#[derive(Debug)]
pub struct MockGateway {
    state: Mutex<MockState>,
    latency: Duration,
}

impl MockGateway {
    /// Daemon in the given run state, toggles take effect, no configuration
    pub fn new(running: bool) -> Self {
        Self {
            state: Mutex::new(MockState {
                running,
                toggle_applies: true,
                config: Some(Ok(None)),
                ..MockState::default()
            }),
            latency: Duration::ZERO,
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Configuration returned by `fetch_config`
    pub fn with_config(self, config: Option<ConfigSummary>) -> Self {
        self.state.lock().config = Some(Ok(config));
        self
    }

    /// Make `fetch_config` fail
    pub fn with_failing_config(self) -> Self {
        self.state.lock().config = Some(Err(RemoteCallFailure::new(
            PluginMethod::GetConfig,
            "mock config failure",
        )));
        self
    }

    /// Successful toggle requests leave the run state untouched
    pub fn with_noop_toggle(self) -> Self {
        self.state.lock().toggle_applies = false;
        self
    }

    /// Queue `is_running` answers; `None` is a failed call
    pub fn script_queries(self, answers: impl IntoIterator<Item = Option<bool>>) -> Self {
        self.state.lock().queries.extend(answers);
        self
    }

    /// Queue `toggle` outcomes; `false` is a failed call
    pub fn script_toggles(self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.state.lock().toggles.extend(outcomes);
        self
    }

    /// Change the run state behind the panel's back
    pub fn set_running(&self, running: bool) {
        self.state.lock().running = running;
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn query_calls(&self) -> usize {
        self.state.lock().query_calls
    }

    pub fn toggle_calls(&self) -> usize {
        self.state.lock().toggle_calls
    }

    pub fn config_calls(&self) -> usize {
        self.state.lock().config_calls
    }

    pub fn total_calls(&self) -> usize {
        let state = self.state.lock();
        state.query_calls + state.toggle_calls + state.config_calls
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait::async_trait]
impl Gateway for MockGateway {
    async fn query_running(&self) -> CallResult<bool> {
        self.state.lock().query_calls += 1;
        self.simulate_latency().await;

        let mut state = self.state.lock();
        match state.queries.pop_front() {
            Some(Some(running)) => Ok(running),
            Some(None) => Err(RemoteCallFailure::new(PluginMethod::IsRunning, "scripted failure")),
            None => Ok(state.running),
        }
    }

    async fn request_toggle(&self) -> CallResult<()> {
        self.state.lock().toggle_calls += 1;
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if !state.toggles.pop_front().unwrap_or(true) {
            return Err(RemoteCallFailure::new(PluginMethod::Toggle, "scripted failure"));
        }
        if state.toggle_applies {
            state.running = !state.running;
        }
        Ok(())
    }

    async fn fetch_config(&self) -> CallResult<Option<ConfigSummary>> {
        self.state.lock().config_calls += 1;
        self.simulate_latency().await;

        self.state.lock().config.clone().unwrap_or(Ok(None))
    }
}
