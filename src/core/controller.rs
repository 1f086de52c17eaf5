//! Reconciling toggle controller
//!
//! Keeps a believed [`RunState`] for the daemon and converges it to ground
//! truth by polling. Polls are authoritative and overwrite the belief; toggles
//! flip it optimistically and are corrected by the poll that follows them.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::state::RunState;
use crate::gateway::{CallResult, Gateway};

/// Belief plus the two transitions that mutate it.
///
/// Does not spawn anything; [`ToggleController`] drives it on a timer.
pub struct Reconciler {
    gateway: Arc<dyn Gateway>,
    believed: watch::Sender<RunState>,
}

impl Reconciler {
    /// Fresh belief, `Stopped` until the first poll resolves
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (believed, _) = watch::channel(RunState::default());
        Self { gateway, believed }
    }

    pub fn believed(&self) -> RunState {
        *self.believed.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.believed.subscribe()
    }

    /// Query the daemon and overwrite the belief with the answer.
    ///
    /// A failed query leaves the belief untouched.
    pub async fn poll(&self) -> CallResult<RunState> {
        match self.gateway.query_running().await {
            Ok(running) => {
                let state = RunState::from_running(running);
                let previous = self.believed.send_replace(state);
                if previous != state {
                    debug!(from = %previous, to = %state, "believed state reconciled");
                }
                Ok(state)
            }
            Err(e) => {
                debug!(error = %e, "poll failed, keeping believed state");
                Err(e)
            }
        }
    }

    /// Optimistically flip the belief. Returns the state it had before.
    pub fn begin_toggle(&self) -> RunState {
        let mut previous = RunState::default();
        self.believed.send_modify(|state| {
            previous = *state;
            *state = state.toggled();
        });
        previous
    }

    /// Send the toggle request, then re-poll whatever its outcome.
    ///
    /// Returns the state confirmed by that poll.
    pub async fn finish_toggle(&self) -> CallResult<RunState> {
        if let Err(e) = self.gateway.request_toggle().await {
            warn!(error = %e, "toggle request failed");
        }
        self.poll().await
    }

    /// Full toggle: flip, request, correct.
    pub async fn toggle(&self) -> CallResult<RunState> {
        let previous = self.begin_toggle();
        info!(from = %previous, to = %previous.toggled(), "toggling deckshot");
        self.finish_toggle().await
    }

    /// Learn the current state, toggle, and return the state observed after.
    ///
    /// Nothing is sent when the current state cannot be read.
    pub async fn toggle_confirmed(&self) -> CallResult<RunState> {
        self.poll().await?;
        self.toggle().await
    }
}

/// Drives a [`Reconciler`] for the lifetime of a mounted panel.
///
/// Polls on a fixed interval starting immediately. Dropping the controller
/// (or calling [`stop`](Self::stop)) cancels the loop and any toggle still in
/// flight, after which no gateway call is issued.
pub struct ToggleController {
    reconciler: Arc<Reconciler>,
    poll_task: Option<JoinHandle<()>>,
    toggles: Mutex<JoinSet<()>>,
    interval: Duration,
}

impl ToggleController {
    /// Start reconciling against `gateway` every `interval`.
    ///
    /// Must be called from within a tokio runtime. `interval` must be non-zero.
    pub fn start(gateway: Arc<dyn Gateway>, interval: Duration) -> Self {
        let reconciler = Arc::new(Reconciler::new(gateway));
        let poll_task = tokio::spawn(run_poll_loop(Arc::clone(&reconciler), interval));

        info!(interval_ms = interval.as_millis() as u64, "reconciliation loop started");

        Self {
            reconciler,
            poll_task: Some(poll_task),
            toggles: Mutex::new(JoinSet::new()),
            interval,
        }
    }

    pub fn believed_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn state(&self) -> RunState {
        self.reconciler.believed()
    }

    /// Receiver that observes every belief update
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.reconciler.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.poll_task.is_some()
    }

    /// Flip the run state. Fire-and-forget: the belief flips before this
    /// returns and is corrected by polling afterwards.
    pub fn toggle(&self) {
        if !self.is_active() {
            debug!("toggle ignored, controller stopped");
            return;
        }

        let previous = self.reconciler.begin_toggle();
        info!(from = %previous, to = %previous.toggled(), "toggling deckshot");

        let reconciler = Arc::clone(&self.reconciler);
        let mut toggles = self.toggles.lock();
        while toggles.try_join_next().is_some() {}
        toggles.spawn(async move {
            let _ = reconciler.finish_toggle().await;
        });
    }

    /// Cancel the reconciliation loop and in-flight toggles. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
            self.toggles.lock().abort_all();
            info!("reconciliation loop stopped");
        }
    }
}

impl Drop for ToggleController {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_poll_loop(reconciler: Arc<Reconciler>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let _ = reconciler.poll().await;
    }
}
