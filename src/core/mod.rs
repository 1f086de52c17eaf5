//! Core module - configuration, run state and the reconciling controller

pub mod config;
pub mod controller;
pub mod state;
