//! Shared utilities for orgalert
//!
//! This crate provides:
//! - ID types (CycleId)
//! - Time utilities (mock-aware clock, calendar-day math, formatting)
//! - Retry backoff with jitter
//! - Default paths for the config file and runtime state

mod backoff;
mod ids;
mod paths;
mod time;

pub use backoff::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
