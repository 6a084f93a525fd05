//! Linux adapters for orgalertd
//!
//! Provides:
//! - An agenda parser that runs an external command emitting NDJSON candidates
//! - Desktop notifications through `notify-send`

mod notify;
mod parser;

pub use notify::*;
pub use parser::*;
