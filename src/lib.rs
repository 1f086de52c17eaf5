//! Deckshot control panel
//!
//! Shows and toggles the run state of the Deckshot screenshot uploader and a
//! read-only summary of its configuration.
//!
//! # Features
//! - Polls the plugin backend and keeps a believed run state in sync with the daemon
//! - Optimistic toggle, corrected by the poll that follows it
//! - Configuration summary fetched once per mount
//! - WebSocket gateway to the backend, plus an in-memory mock daemon

pub mod core;
pub mod gateway;
pub mod panel;

pub use core::config::Config;
pub use core::controller::{Reconciler, ToggleController};
pub use core::state::{ConfigState, RunState};
pub use gateway::{CallResult, Gateway, MockGateway, RemoteCallFailure, WsGateway};
pub use panel::{Panel, PanelHandle};
