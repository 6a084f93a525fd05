//! Validation gate - runtime preconditions for a refresh

use orgalert_host_api::AgendaParser;
use std::fmt;
use std::path::{Path, PathBuf};

/// A precondition that does not hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    NoSources,
    MissingSource(PathBuf),
    ParserUnavailable(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NoSources => write!(f, "No agenda sources configured"),
            ValidationIssue::MissingSource(path) => {
                write!(f, "Agenda source does not exist: {}", path.display())
            }
            ValidationIssue::ParserUnavailable(name) => {
                write!(f, "Agenda parser '{}' is not available", name)
            }
        }
    }
}

/// Process-wide validation progress, owned by the refresh scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationState {
    /// Set after the first passing validation; later cycles skip the gate
    pub done: bool,
    /// Failed validation attempts since the last reset
    pub retry_count: u32,
}

impl ValidationState {
    pub fn record_pass(&mut self) {
        self.done = true;
    }

    pub fn record_failure(&mut self) {
        self.done = false;
        self.retry_count = self.retry_count.saturating_add(1);
    }

    /// Forget earlier results, e.g. after the source list changed
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Check refresh preconditions in order, stopping at the first failing check.
///
/// Returns every issue found by that check; an empty list means pass.
pub fn check_preconditions(sources: &[PathBuf], parser: &dyn AgendaParser) -> Vec<ValidationIssue> {
    if sources.is_empty() {
        return vec![ValidationIssue::NoSources];
    }

    let missing: Vec<ValidationIssue> = sources
        .iter()
        .filter(|path| !source_exists(path))
        .map(|path| ValidationIssue::MissingSource(path.clone()))
        .collect();
    if !missing.is_empty() {
        return missing;
    }

    if !parser.is_available() {
        return vec![ValidationIssue::ParserUnavailable(parser.name().to_string())];
    }

    Vec::new()
}

fn source_exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}
