//! Capability traits for orgalert collaborators
//!
//! This crate defines the narrow interfaces between the scheduling core and
//! the things it does not own: the agenda parser and the alert presenter.
//! It contains no platform code itself. In-memory implementations for tests
//! live in [`mock`](crate::MockParser).

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
