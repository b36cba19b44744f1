#![forbid(unsafe_code)]

//! Core model and timing logic for guided breathing exercises.
//!
//! This crate provides:
//! - Exercise definitions and the built-in catalog
//! - A logical-clock job scheduler
//! - The live exercise engine and its host port
//! - The offline cue schedule builder
//! - Config and persisted selection

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod ramp;
pub mod scheduler;
pub mod timed_step;
pub mod repeat;
pub mod port;
pub mod engine;
pub mod playback;
pub mod state;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, Catalog};
pub use config::Config;
pub use scheduler::{JobOptions, JobQueue, Scheduler};
pub use port::EnginePort;
pub use engine::{Engine, EngineJob};
pub use playback::{
    build_playback_schedule, calculate_exercise_duration, is_offline_eligible, CueEvent,
    PlaybackSchedule,
};
pub use state::SelectionState;
