//! Refresh scheduler
//!
//! Cycle state machine:
//!
//! ```text
//! Idle -> Validating -> Collecting -> Matching -> Publishing -> Idle
//!              |             |
//!              +--> Failed <-+          (next cycle starts from Idle again)
//! ```
//!
//! The scheduler is the only writer of the validation state, the alert
//! tracker and the published snapshot. One cycle runs at a time; a cycle
//! triggered while another is in flight is skipped, not queued.

use chrono::{DateTime, Local};
use orgalert_api::{AgendaSnapshot, EventKey};
use orgalert_config::{ScheduleSettings, Settings};
use orgalert_host_api::{AgendaParser, AlertPresenter};
use orgalert_util::{CycleId, RetryBackoff};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    AlertTracker, CollectionRunner, CycleOutcome, EventCollector, FailureReason, SourceSet,
    ValidationIssue, ValidationState, alert_message, apply_matches, check_preconditions,
    render_summary, upcoming_events,
};

/// Which step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Collection,
}

/// Current position in the cycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Validating,
    Collecting,
    Matching,
    Publishing,
    /// Last cycle failed; the next cycle starts over from Idle
    Failed(FailureKind),
}

impl CycleState {
    fn in_progress(&self) -> bool {
        matches!(
            self,
            CycleState::Validating
                | CycleState::Collecting
                | CycleState::Matching
                | CycleState::Publishing
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Orchestrates refresh cycles and owns all scheduler state
pub struct RefreshScheduler {
    schedule: ScheduleSettings,
    summary_max_items: usize,
    sources: SourceSet,
    collector: Arc<EventCollector>,
    presenter: Arc<dyn AlertPresenter>,
    runner: Arc<dyn CollectionRunner>,
    backoff: RetryBackoff,

    validation: Mutex<ValidationState>,
    tracker: Mutex<AlertTracker>,
    state: Mutex<CycleState>,
    snapshot_tx: watch::Sender<Arc<AgendaSnapshot>>,
    shutdown_tx: watch::Sender<bool>,

    in_flight: AtomicBool,
    activated: AtomicBool,
}

/// Clears the in-flight flag when a cycle ends, however it ends
struct CycleGuard<'a> {
    scheduler: &'a RefreshScheduler,
}

impl<'a> CycleGuard<'a> {
    fn acquire(scheduler: &'a RefreshScheduler) -> Option<Self> {
        scheduler
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { scheduler })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(&self.scheduler.state);
        if state.in_progress() {
            *state = CycleState::Idle;
        }
        drop(state);
        self.scheduler.in_flight.store(false, Ordering::Release);
    }
}

impl RefreshScheduler {
    /// Create a dormant scheduler. Call [`RefreshScheduler::activate`] to start it.
    pub fn new(
        settings: &Settings,
        sources: SourceSet,
        parser: Arc<dyn AgendaParser>,
        presenter: Arc<dyn AlertPresenter>,
        runner: Arc<dyn CollectionRunner>,
    ) -> Arc<Self> {
        let schedule = settings.schedule.clone();
        let backoff = RetryBackoff::new(
            schedule.refresh_period,
            schedule.max_backoff,
            schedule.jitter_ratio,
        );
        let collector = Arc::new(EventCollector::new(
            parser,
            settings.agenda.clone(),
            settings.default_intervals.clone(),
        ));
        let (snapshot_tx, _) = watch::channel(Arc::new(AgendaSnapshot::default()));
        let (shutdown_tx, _) = watch::channel(false);

        info!(
            sources = sources.len(),
            lookahead_minutes = schedule.lookahead_minutes,
            refresh_period_secs = schedule.refresh_period.as_secs(),
            "Refresh scheduler created"
        );

        Arc::new(Self {
            schedule,
            summary_max_items: settings.display.summary_max_items,
            sources,
            collector,
            presenter,
            runner,
            backoff,
            validation: Mutex::new(ValidationState::default()),
            tracker: Mutex::new(AlertTracker::new()),
            state: Mutex::new(CycleState::Idle),
            snapshot_tx,
            shutdown_tx,
            in_flight: AtomicBool::new(false),
            activated: AtomicBool::new(false),
        })
    }

    /// Run one full cycle at `now`
    pub async fn refresh(&self, now: DateTime<Local>) -> CycleOutcome {
        if !self.is_alive() {
            return CycleOutcome::Cancelled;
        }
        let Some(_guard) = CycleGuard::acquire(self) else {
            debug!("Refresh already in flight, skipping");
            return CycleOutcome::Skipped;
        };

        let cycle_id = CycleId::new();
        let sources = self.sources.list();
        debug!(cycle_id = %cycle_id, sources = sources.len(), "Refresh cycle started");

        self.set_state(CycleState::Validating);
        if let Err(reason) = self.validate(&cycle_id, &sources) {
            self.set_state(CycleState::Failed(FailureKind::Validation));
            return CycleOutcome::Failed { cycle_id, reason };
        }

        self.set_state(CycleState::Collecting);
        let result = self
            .runner
            .run(Arc::clone(&self.collector), sources, now)
            .await;

        if !self.is_alive() {
            debug!(
                cycle_id = %cycle_id,
                "Scheduler shut down during collection, discarding result"
            );
            return CycleOutcome::Cancelled;
        }

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                error!(cycle_id = %cycle_id, error = %e, "Collection failed");
                self.set_state(CycleState::Failed(FailureKind::Collection));
                return CycleOutcome::Failed {
                    cycle_id,
                    reason: FailureReason::Collection(e),
                };
            }
        };

        self.set_state(CycleState::Matching);
        let fired = {
            let mut tracker = lock(&self.tracker);
            // Events of a failed source are unknown this cycle, not gone
            if report.failed_sources.is_empty() {
                let live: HashSet<EventKey> =
                    report.events.iter().map(|e| e.key().clone()).collect();
                let pruned = tracker.prune(&live);
                if pruned > 0 {
                    debug!(cycle_id = %cycle_id, pruned, "Alert records pruned");
                }
            } else {
                debug!(
                    cycle_id = %cycle_id,
                    failed_sources = report.failed_sources.len(),
                    "Skipping alert pruning after partial collection"
                );
            }
            apply_matches(&report.events, now, &mut tracker)
        };
        let upcoming = upcoming_events(&report.events, &now, self.schedule.lookahead_minutes);
        let summary = render_summary(&upcoming, self.summary_max_items);

        self.set_state(CycleState::Publishing);
        let mut alerts_presented = 0;
        let mut alerts_failed = 0;
        for alert in &fired {
            let message = alert_message(&alert.event, alert.delta_minutes, &now);
            info!(
                cycle_id = %cycle_id,
                event = %alert.event.key(),
                threshold_minutes = alert.tier.threshold_minutes,
                severity = %alert.tier.severity,
                delta_minutes = alert.delta_minutes,
                "Alert fired"
            );

            match self
                .presenter
                .present(alert.event.title(), &message, alert.tier.severity)
                .await
            {
                Ok(()) => alerts_presented += 1,
                Err(e) => {
                    warn!(
                        cycle_id = %cycle_id,
                        event = %alert.event.key(),
                        error = %e,
                        "Failed to present alert"
                    );
                    alerts_failed += 1;
                }
            }
        }

        let in_window = upcoming.len();
        let snapshot = AgendaSnapshot {
            cycle_id: Some(cycle_id),
            generated_at: Some(now),
            summary,
            upcoming,
        };
        self.snapshot_tx.send_replace(Arc::new(snapshot));
        self.set_state(CycleState::Idle);

        info!(
            cycle_id = %cycle_id,
            events = report.events.len(),
            in_window,
            alerts = fired.len(),
            failed_sources = report.failed_sources.len(),
            "Agenda published"
        );

        CycleOutcome::Published {
            cycle_id,
            event_count: report.events.len(),
            in_window,
            alerts_presented,
            alerts_failed,
            failed_sources: report.failed_sources.len(),
        }
    }

    fn validate(&self, cycle_id: &CycleId, sources: &[PathBuf]) -> Result<(), FailureReason> {
        if lock(&self.validation).done {
            return Ok(());
        }

        let issues: Vec<ValidationIssue> =
            check_preconditions(sources, self.collector.parser().as_ref());

        let mut validation = lock(&self.validation);
        if issues.is_empty() {
            validation.record_pass();
            info!(cycle_id = %cycle_id, sources = sources.len(), "Preconditions validated");
            return Ok(());
        }

        validation.record_failure();
        for issue in &issues {
            warn!(
                cycle_id = %cycle_id,
                retry_count = validation.retry_count,
                issue = %issue,
                "Validation failed"
            );
        }
        Err(FailureReason::Validation {
            issues,
            retry_count: validation.retry_count,
        })
    }

    /// Delay before the next cycle after `outcome`; None keeps the current cadence
    pub fn next_delay(&self, outcome: &CycleOutcome) -> Option<Duration> {
        match outcome {
            CycleOutcome::Published { .. } => Some(self.schedule.refresh_period),
            CycleOutcome::Failed {
                reason: FailureReason::Validation { retry_count, .. },
                ..
            } => Some(self.backoff.delay(*retry_count)),
            CycleOutcome::Failed {
                reason: FailureReason::Collection(_),
                ..
            } => Some(self.schedule.refresh_period),
            CycleOutcome::Skipped | CycleOutcome::Cancelled => None,
        }
    }

    /// Start the self-rearming driver after the configured startup delay.
    ///
    /// Only the first call has an effect.
    pub fn activate(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.activated.swap(true, Ordering::AcqRel) {
            warn!("Refresh scheduler already activated");
            return None;
        }

        let scheduler = Arc::clone(self);
        Some(tokio::spawn(async move { scheduler.drive().await }))
    }

    async fn drive(self: Arc<Self>) {
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut delay = self.schedule.startup_delay;
        let mut period = self.schedule.refresh_period;

        info!(
            startup_delay_secs = delay.as_secs(),
            "Refresh scheduler activated"
        );

        while self.is_alive() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let outcome = self.refresh(orgalert_util::now()).await;
            if let Some(next) = self.next_delay(&outcome) {
                period = next;
            }
            delay = period;
            debug!(delay_secs = delay.as_secs(), "Next refresh scheduled");
        }

        debug!("Refresh scheduler stopped");
    }

    /// Run a cycle now on a separate task, for interactive triggers
    pub fn trigger(self: &Arc<Self>) -> JoinHandle<CycleOutcome> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.refresh(orgalert_util::now()).await })
    }

    /// Stop the driver. A collection still in flight is discarded when it returns.
    pub fn shutdown(&self) {
        if self.shutdown_tx.send_replace(true) {
            return;
        }
        info!("Refresh scheduler shutting down");
    }

    pub fn is_alive(&self) -> bool {
        !*self.shutdown_tx.borrow()
    }

    /// Replace the source list and force the next cycle to re-validate
    pub fn reconfigure(&self, sources: Vec<PathBuf>) {
        info!(sources = sources.len(), "Agenda sources reconfigured");
        self.sources.replace(sources);
        lock(&self.validation).reset();
    }

    /// Latest published summary line
    pub fn summary(&self) -> String {
        self.snapshot_tx.borrow().summary.clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<AgendaSnapshot> {
        Arc::clone(&self.snapshot_tx.borrow())
    }

    /// Receive every newly published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<AgendaSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn cycle_state(&self) -> CycleState {
        *lock(&self.state)
    }

    pub fn validation_state(&self) -> ValidationState {
        *lock(&self.validation)
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Number of tracked alert records
    pub fn tracked_alerts(&self) -> usize {
        lock(&self.tracker).len()
    }

    fn set_state(&self, next: CycleState) {
        let mut state = lock(&self.state);
        debug!(from = ?*state, to = ?next, "Cycle state transition");
        *state = next;
    }
}
