// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains the configuration, the monitored targets, and the
//! observation events produced by a check cycle.

mod config;
mod event;
mod messages;
mod target;

// Re-export all public types
pub use config::{
    BackoffKind, Config, FetchConfig, LoggingConfig, NormalizeConfig, NotifyConfig, SaveMode,
    StateConfig,
};
pub use event::{CycleReport, DetectionEvent, Observation};
pub use messages::Messages;
pub use target::{FetchPolicy, Target};
