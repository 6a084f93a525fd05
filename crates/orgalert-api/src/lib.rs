//! Shared data model for orgalert
//!
//! This crate defines the types that flow between the parser capability,
//! the scheduling core, and display consumers:
//! - Raw candidates as produced by an agenda parser
//! - Normalized events with their alert ladders
//! - Alert identity for de-duplication
//! - Published snapshots and summaries

mod snapshot;
mod types;

pub use snapshot::*;
pub use types::*;
