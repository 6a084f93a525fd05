//! Integration tests for orgalertd
//!
//! These tests drive full refresh cycles through the scheduler with an
//! in-memory parser and presenter.

use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use orgalert_api::{RawCandidate, Severity};
use orgalert_config::Settings;
use orgalert_core::{
    BackgroundRunner, CollectionRunner, CycleOutcome, CycleState, InlineRunner, RefreshScheduler,
    SourceSet, ValidationState,
};
use orgalert_host_api::{MockParser, RecordingPresenter};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::NamedTempFile;

fn make_test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.schedule.lookahead_minutes = 1440;
    settings.schedule.startup_delay = Duration::from_secs(10);
    settings.schedule.refresh_period = Duration::from_secs(300);
    settings.schedule.jitter_ratio = 0.0;
    settings
}

/// Mid-morning on a day without a DST transition
fn test_now() -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 4, 2, 10, 0, 0).unwrap()
}

fn stamp(at: DateTime<Local>) -> String {
    format!("<{}>", at.format("%Y-%m-%d %a %H:%M"))
}

fn todo(title: &str, at: DateTime<Local>) -> RawCandidate {
    RawCandidate::new(title, "TODO", vec![format!("SCHEDULED: {}", stamp(at))])
}

struct Harness {
    parser: Arc<MockParser>,
    presenter: Arc<RecordingPresenter>,
    scheduler: Arc<RefreshScheduler>,
    sources: Vec<NamedTempFile>,
}

impl Harness {
    fn new(source_count: usize, runner: Arc<dyn CollectionRunner>) -> Self {
        let sources: Vec<NamedTempFile> =
            (0..source_count).map(|_| NamedTempFile::new().unwrap()).collect();
        let parser = Arc::new(MockParser::new());
        for source in &sources {
            parser.set_candidates(source.path(), vec![]);
        }
        let presenter = Arc::new(RecordingPresenter::new());
        let scheduler = RefreshScheduler::new(
            &make_test_settings(),
            SourceSet::new(sources.iter().map(|s| s.path().to_path_buf()).collect()),
            parser.clone(),
            presenter.clone(),
            runner,
        );

        Self {
            parser,
            presenter,
            scheduler,
            sources,
        }
    }

    fn source(&self, index: usize) -> &Path {
        self.sources[index].path()
    }
}

#[tokio::test]
async fn test_mixed_agenda_within_a_day() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let now = test_now();
    h.parser.set_candidates(
        h.source(0),
        vec![
            todo("Write report", now + ChronoDuration::hours(2)),
            todo("Call plumber", now + ChronoDuration::hours(5)),
            todo("Weekly review", now + ChronoDuration::hours(24)),
            todo("Submit timesheet", now - ChronoDuration::hours(1)),
            RawCandidate::new("Old task", "DONE", vec![stamp(now + ChronoDuration::hours(1))]),
        ],
    );

    let outcome = h.scheduler.refresh(now).await;
    let CycleOutcome::Published {
        event_count,
        in_window,
        alerts_presented,
        failed_sources,
        ..
    } = outcome
    else {
        panic!("expected a published cycle, got {:?}", outcome);
    };

    assert_eq!(event_count, 4);
    // Exactly 24h away is still inside a 1440 minute window
    assert_eq!(in_window, 4);
    assert_eq!(failed_sources, 0);

    // Only the overdue item has crossed the default 10 minute tier
    assert_eq!(alerts_presented, 1);
    let alerts = h.presenter.alerts_for("Submit timesheet");
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, "Overdue since 09:00");

    let snapshot = h.scheduler.snapshot();
    let titles: Vec<&str> = snapshot.upcoming.iter().map(|e| e.title()).collect();
    assert_eq!(
        titles,
        vec!["Submit timesheet", "Write report", "Call plumber", "Weekly review"]
    );
    assert!(!snapshot.summary.contains("Old task"));
}

#[tokio::test]
async fn test_summary_lists_event_in_window() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let now = test_now();
    h.parser
        .set_candidates(h.source(0), vec![todo("Dentist", now + ChronoDuration::hours(1))]);

    let outcome = h.scheduler.refresh(now).await;
    assert!(matches!(
        outcome,
        CycleOutcome::Published { event_count: 1, in_window: 1, .. }
    ));
    assert_eq!(h.scheduler.summary(), "11:00 Dentist");
    assert_eq!(h.presenter.count(), 0);
}

#[tokio::test]
async fn test_far_future_event_is_outside_window() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let now = test_now();
    h.parser.set_candidates(
        h.source(0),
        vec![todo("Renew passport", now + ChronoDuration::days(30))],
    );

    let outcome = h.scheduler.refresh(now).await;
    assert!(matches!(
        outcome,
        CycleOutcome::Published { event_count: 1, in_window: 0, .. }
    ));
    assert!(h.scheduler.snapshot().is_published());
    assert_eq!(h.scheduler.summary(), "");
}

#[tokio::test]
async fn test_overdue_event_collapses_to_most_urgent_tier() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let now = test_now();
    h.parser.set_candidates(
        h.source(0),
        vec![
            todo("Pay rent", now - ChronoDuration::minutes(90))
                .with_property("ALERT_INTERVALS", "10:low 30:medium 60:high"),
        ],
    );

    h.scheduler.refresh(now).await;
    let alerts = h.presenter.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Low);
    assert_eq!(alerts[0].message, "Overdue since 08:30");
    // Every crossed tier is recorded, presented or not
    assert_eq!(h.scheduler.tracked_alerts(), 3);

    h.scheduler.refresh(now + ChronoDuration::minutes(1)).await;
    assert_eq!(h.presenter.count(), 1);
}

#[tokio::test]
async fn test_ladder_fires_each_tier_once() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let now = test_now();
    let due = now + ChronoDuration::minutes(45);
    h.parser.set_candidates(
        h.source(0),
        vec![todo("Flight", due).with_property("ALERT_INTERVALS", "60:low 30 5:high")],
    );

    h.scheduler.refresh(now).await;
    h.scheduler.refresh(now + ChronoDuration::minutes(5)).await;
    assert_eq!(h.presenter.count(), 1);

    h.scheduler.refresh(due - ChronoDuration::minutes(30)).await;
    h.scheduler.refresh(due - ChronoDuration::minutes(4)).await;
    h.scheduler.refresh(due - ChronoDuration::minutes(2)).await;

    let severities: Vec<Severity> = h.presenter.alerts().iter().map(|a| a.severity).collect();
    assert_eq!(severities, vec![Severity::Low, Severity::Medium, Severity::High]);
    assert_eq!(h.presenter.alerts()[2].message, "Due in 4 minutes (at 10:45)");
}

#[tokio::test]
async fn test_no_duplicate_alerts_across_refreshes() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let now = test_now();
    h.parser
        .set_candidates(h.source(0), vec![todo("Standup", now + ChronoDuration::minutes(5))]);

    for minute in 0..4 {
        h.scheduler.refresh(now + ChronoDuration::minutes(minute)).await;
    }
    assert_eq!(h.presenter.count(), 1);
}

#[tokio::test]
async fn test_vanished_event_is_pruned_and_can_fire_again() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let now = test_now();
    let standup = todo("Standup", now + ChronoDuration::minutes(5));
    h.parser.set_candidates(h.source(0), vec![standup.clone()]);

    h.scheduler.refresh(now).await;
    assert_eq!(h.scheduler.tracked_alerts(), 1);

    h.parser.set_candidates(h.source(0), vec![]);
    h.scheduler.refresh(now).await;
    assert_eq!(h.scheduler.tracked_alerts(), 0);

    h.parser.set_candidates(h.source(0), vec![standup]);
    h.scheduler.refresh(now).await;
    assert_eq!(h.presenter.alerts_for("Standup").len(), 2);
}

#[tokio::test]
async fn test_transient_source_failure_keeps_alert_records() {
    let h = Harness::new(2, Arc::new(InlineRunner));
    let now = test_now();
    let overdue = todo("Expense report", now - ChronoDuration::hours(2));
    h.parser.set_candidates(h.source(0), vec![overdue.clone()]);
    h.parser
        .set_candidates(h.source(1), vec![todo("Gym", now + ChronoDuration::hours(3))]);

    h.scheduler.refresh(now).await;
    assert_eq!(h.presenter.alerts_for("Expense report").len(), 1);
    let tracked = h.scheduler.tracked_alerts();

    // Caught mid-save
    h.parser.set_malformed(h.source(0), "truncated file");
    let outcome = h.scheduler.refresh(now + ChronoDuration::minutes(5)).await;
    assert!(matches!(outcome, CycleOutcome::Published { failed_sources: 1, .. }));
    assert_eq!(h.scheduler.tracked_alerts(), tracked);

    h.parser.set_candidates(h.source(0), vec![overdue]);
    h.scheduler.refresh(now + ChronoDuration::minutes(10)).await;
    assert_eq!(h.presenter.alerts_for("Expense report").len(), 1);
}

#[tokio::test]
async fn test_validation_short_circuit_with_no_sources() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    h.scheduler.reconfigure(vec![]);

    let outcome = h.scheduler.refresh(test_now()).await;
    assert!(outcome.is_validation_failure());
    assert_eq!(h.parser.parse_calls(), 0);
    assert!(!h.scheduler.snapshot().is_published());
    assert_eq!(
        h.scheduler.validation_state(),
        ValidationState { done: false, retry_count: 1 }
    );
}

#[tokio::test]
async fn test_missing_source_recovers_after_reconfigure() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let missing = h.source(0).with_extension("gone.org");
    h.scheduler.reconfigure(vec![missing]);

    assert!(h.scheduler.refresh(test_now()).await.is_validation_failure());
    assert!(h.scheduler.refresh(test_now()).await.is_validation_failure());
    assert_eq!(h.scheduler.validation_state().retry_count, 2);

    h.scheduler.reconfigure(vec![h.source(0).to_path_buf()]);
    assert!(h.scheduler.refresh(test_now()).await.is_published());
    assert_eq!(
        h.scheduler.validation_state(),
        ValidationState { done: true, retry_count: 0 }
    );
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let now = test_now();
    h.parser.set_candidates(
        h.source(0),
        vec![
            todo("Lunch", now + ChronoDuration::hours(2)),
            RawCandidate::new("Birthday", "", vec!["<2025-04-03 Thu>".into()]),
        ],
    );

    h.scheduler.refresh(now).await;
    let first = h.scheduler.snapshot();
    h.scheduler.refresh(now).await;
    let second = h.scheduler.snapshot();

    assert_ne!(first.cycle_id, second.cycle_id);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.upcoming, second.upcoming);
    assert_eq!(second.summary, "12:00 Lunch | Birthday (all day)");
}

#[tokio::test]
async fn test_refresh_while_in_flight_is_skipped() {
    let h = Harness::new(1, Arc::new(BackgroundRunner));
    let release = h.parser.hold_next_parse();

    let first = h.scheduler.trigger();
    while h.parser.parse_calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.scheduler.cycle_state(), CycleState::Collecting);
    assert!(matches!(
        h.scheduler.refresh(test_now()).await,
        CycleOutcome::Skipped
    ));

    release.notify_one();
    assert!(first.await.unwrap().is_published());
    assert_eq!(h.scheduler.cycle_state(), CycleState::Idle);
    assert_eq!(h.parser.parse_calls(), 1);
}

#[tokio::test]
async fn test_partial_source_failure_still_publishes() {
    let h = Harness::new(2, Arc::new(InlineRunner));
    let now = test_now();
    h.parser.set_malformed(h.source(0), "unterminated drawer");
    h.parser
        .set_candidates(h.source(1), vec![todo("Gym", now + ChronoDuration::hours(3))]);

    let outcome = h.scheduler.refresh(now).await;
    assert!(matches!(
        outcome,
        CycleOutcome::Published { event_count: 1, failed_sources: 1, .. }
    ));
    assert_eq!(h.scheduler.summary(), "13:00 Gym");

    h.parser.set_unreadable(h.source(1), "permission denied");
    assert!(h.scheduler.refresh(now).await.is_collection_failure());
    assert_eq!(h.scheduler.summary(), "13:00 Gym");
}

#[tokio::test]
async fn test_presenter_failure_does_not_block_publication() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let now = test_now();
    h.presenter.fail_present.store(true, Ordering::SeqCst);
    h.parser
        .set_candidates(h.source(0), vec![todo("Standup", now + ChronoDuration::minutes(3))]);

    let outcome = h.scheduler.refresh(now).await;
    assert!(matches!(
        outcome,
        CycleOutcome::Published { alerts_presented: 0, alerts_failed: 1, .. }
    ));
    assert_eq!(h.scheduler.summary(), "10:03 Standup");
}

#[tokio::test]
async fn test_duplicate_events_across_sources_alert_once() {
    let h = Harness::new(2, Arc::new(InlineRunner));
    let now = test_now();
    let shared = todo("Team sync", now + ChronoDuration::minutes(8));
    h.parser.set_candidates(h.source(0), vec![shared.clone()]);
    h.parser.set_candidates(h.source(1), vec![shared]);

    let outcome = h.scheduler.refresh(now).await;
    assert!(matches!(outcome, CycleOutcome::Published { event_count: 1, .. }));
    assert_eq!(h.presenter.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_activated_service_publishes_after_startup_delay() {
    let h = Harness::new(1, Arc::new(InlineRunner));
    let mut rx = h.scheduler.subscribe();
    let driver = h.scheduler.activate().unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_published());

    h.scheduler.shutdown();
    driver.await.unwrap();
    assert!(!h.scheduler.is_alive());
}
