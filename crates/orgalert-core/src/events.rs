//! Outcomes reported by the refresh scheduler

use orgalert_util::CycleId;

use crate::{CollectionError, ValidationIssue};

/// Why a cycle failed
#[derive(Debug)]
pub enum FailureReason {
    /// Preconditions did not hold; nothing was collected
    Validation {
        issues: Vec<ValidationIssue>,
        retry_count: u32,
    },

    /// Collection failed as a whole
    Collection(CollectionError),
}

/// Result of one call to `RefreshScheduler::refresh`
#[derive(Debug)]
pub enum CycleOutcome {
    /// A new snapshot was published
    Published {
        cycle_id: CycleId,
        event_count: usize,
        in_window: usize,
        alerts_presented: usize,
        alerts_failed: usize,
        failed_sources: usize,
    },

    /// The cycle stopped early; previously published state is untouched
    Failed {
        cycle_id: CycleId,
        reason: FailureReason,
    },

    /// Another cycle was already in flight
    Skipped,

    /// The scheduler was shut down before the cycle could publish
    Cancelled,
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published { .. })
    }

    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            CycleOutcome::Failed {
                reason: FailureReason::Validation { .. },
                ..
            }
        )
    }

    pub fn is_collection_failure(&self) -> bool {
        matches!(
            self,
            CycleOutcome::Failed {
                reason: FailureReason::Collection(_),
                ..
            }
        )
    }
}
