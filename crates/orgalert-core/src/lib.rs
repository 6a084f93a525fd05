//! Event collection and alert scheduling core for orgalertd
//!
//! This crate is the heart of orgalertd, containing:
//! - Timestamp normalization
//! - Event collection across agenda sources
//! - Interval matching and the alert tracker
//! - The validation gate
//! - The refresh scheduler (Idle -> Validating -> Collecting -> Matching -> Publishing)

mod collector;
mod events;
mod matcher;
mod normalize;
mod runner;
mod scheduler;
mod sources;
mod summary;
mod tracker;
mod validation;

pub use collector::*;
pub use events::*;
pub use matcher::*;
pub use normalize::*;
pub use runner::*;
pub use scheduler::*;
pub use sources::*;
pub use summary::*;
pub use tracker::*;
pub use validation::*;
