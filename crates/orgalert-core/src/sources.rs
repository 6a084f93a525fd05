//! Shared, externally owned list of agenda sources

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// Handle to the agenda source list.
///
/// Clones share the same list. The scheduler only reads it; the owner may
/// replace it at any time and the next cycle picks up the change.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    inner: Arc<RwLock<Vec<PathBuf>>>,
}

impl SourceSet {
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(sources)),
        }
    }

    /// Copy of the current list
    pub fn list(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, sources: Vec<PathBuf>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = sources;
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
