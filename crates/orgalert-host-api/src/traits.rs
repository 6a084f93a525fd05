//! Collaborator traits

use async_trait::async_trait;
use orgalert_api::{RawCandidate, Severity};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from parsing a single agenda source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source unreadable: {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Source malformed: {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl SourceError {
    pub fn unreadable(path: &Path, reason: impl Into<String>) -> Self {
        Self::Unreadable {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Unreadable { path, .. } | Self::Malformed { path, .. } => path,
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Errors from presenting an alert
#[derive(Debug, Error)]
pub enum PresentationError {
    #[error("Presenter unavailable: {0}")]
    Unavailable(String),

    #[error("Presentation failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Agenda parser capability - turns one source into candidate records.
///
/// Implementations must be safe to call repeatedly, and concurrently for
/// distinct sources. They must not modify the source.
#[async_trait]
pub trait AgendaParser: Send + Sync {
    /// Short name used in logs and validation issues
    fn name(&self) -> &str;

    /// Whether the parser can currently run (binary installed, library loaded)
    fn is_available(&self) -> bool;

    /// Parse one source
    async fn parse(&self, source: &Path) -> SourceResult<Vec<RawCandidate>>;
}

/// Alert presentation capability - shows a notification to the user.
///
/// Callers treat this as fire-and-forget. A failure is reported but never retried.
#[async_trait]
pub trait AlertPresenter: Send + Sync {
    async fn present(
        &self,
        title: &str,
        message: &str,
        severity: Severity,
    ) -> Result<(), PresentationError>;
}
