//! In-memory collaborators for testing

use async_trait::async_trait;
use orgalert_api::{RawCandidate, Severity};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::{AgendaParser, AlertPresenter, PresentationError, SourceError, SourceResult};

/// Canned parser output for one source
#[derive(Debug, Clone)]
enum MockSource {
    Candidates(Vec<RawCandidate>),
    Unreadable(String),
    Malformed(String),
}

/// Mock agenda parser for unit/integration testing
pub struct MockParser {
    sources: Mutex<HashMap<PathBuf, MockSource>>,
    available: AtomicBool,
    parse_calls: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockParser {
    pub fn new() -> Self {
        Self {
            sources: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            parse_calls: AtomicUsize::new(0),
            gate: Mutex::new(None),
        }
    }

    /// Set the candidates returned for a source, replacing earlier output
    pub fn set_candidates(&self, source: impl Into<PathBuf>, candidates: Vec<RawCandidate>) {
        self.sources
            .lock()
            .unwrap()
            .insert(source.into(), MockSource::Candidates(candidates));
    }

    /// Make a source fail with `SourceError::Unreadable`
    pub fn set_unreadable(&self, source: impl Into<PathBuf>, reason: impl Into<String>) {
        self.sources
            .lock()
            .unwrap()
            .insert(source.into(), MockSource::Unreadable(reason.into()));
    }

    /// Make a source fail with `SourceError::Malformed`
    pub fn set_malformed(&self, source: impl Into<PathBuf>, reason: impl Into<String>) {
        self.sources
            .lock()
            .unwrap()
            .insert(source.into(), MockSource::Malformed(reason.into()));
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `parse` calls so far
    pub fn parse_calls(&self) -> usize {
        self.parse_calls.load(Ordering::SeqCst)
    }

    /// Hold the next `parse` call until the returned handle is notified.
    ///
    /// The hold applies to one call only.
    pub fn hold_next_parse(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }
}

impl Default for MockParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgendaParser for MockParser {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn parse(&self, source: &Path) -> SourceResult<Vec<RawCandidate>> {
        self.parse_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let entry = self.sources.lock().unwrap().get(source).cloned();
        match entry {
            Some(MockSource::Candidates(candidates)) => Ok(candidates),
            Some(MockSource::Unreadable(reason)) => Err(SourceError::unreadable(source, reason)),
            Some(MockSource::Malformed(reason)) => Err(SourceError::malformed(source, reason)),
            None => Err(SourceError::unreadable(source, "no such mock source")),
        }
    }
}

/// An alert captured by [`RecordingPresenter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedAlert {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

/// Presenter that records alerts instead of showing them
#[derive(Default)]
pub struct RecordingPresenter {
    alerts: Mutex<Vec<PresentedAlert>>,
    /// Configure present to fail
    pub fail_present: AtomicBool,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts presented so far, in order
    pub fn alerts(&self) -> Vec<PresentedAlert> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }

    /// Alerts presented for one event title
    pub fn alerts_for(&self, title: &str) -> Vec<PresentedAlert> {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.title == title)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AlertPresenter for RecordingPresenter {
    async fn present(
        &self,
        title: &str,
        message: &str,
        severity: Severity,
    ) -> Result<(), PresentationError> {
        if self.fail_present.load(Ordering::SeqCst) {
            return Err(PresentationError::Failed("Mock presentation failure".into()));
        }

        self.alerts.lock().unwrap().push(PresentedAlert {
            title: title.to_string(),
            message: message.to_string(),
            severity,
        });
        Ok(())
    }
}
