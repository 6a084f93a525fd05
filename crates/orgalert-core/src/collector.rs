//! Event collection - parses every source into normalized events

use chrono::{DateTime, Local};
use orgalert_api::{Event, EventKey, EventState, EventTime, IntervalTier, RawCandidate, Severity};
use orgalert_config::AgendaSettings;
use orgalert_host_api::{AgendaParser, SourceError};
use orgalert_util::{local_from_naive, start_of_day};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::normalize_timestamp;

/// Upper bound on repeater steps when projecting an old timestamp forward
const MAX_REPEAT_STEPS: usize = 100_000;

/// Total collection failure
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("No agenda sources to collect from")]
    NoSources,

    #[error("All {count} agenda sources failed")]
    AllSourcesFailed { count: usize },

    #[error("Collection worker failed: {0}")]
    WorkerFailed(String),
}

/// Result of a successful (possibly partial) collection pass
#[derive(Debug, Default)]
pub struct CollectionReport {
    /// Active events, deduplicated, in first-encounter order
    pub events: Vec<Event>,
    /// Sources that could not be parsed
    pub failed_sources: Vec<SourceError>,
    /// Candidates dropped because no timestamp could be normalized
    pub dropped_candidates: usize,
}

/// Turns agenda sources into normalized events through an [`AgendaParser`]
pub struct EventCollector {
    parser: Arc<dyn AgendaParser>,
    agenda: AgendaSettings,
    default_intervals: Vec<IntervalTier>,
}

impl EventCollector {
    pub fn new(
        parser: Arc<dyn AgendaParser>,
        agenda: AgendaSettings,
        default_intervals: Vec<IntervalTier>,
    ) -> Self {
        Self {
            parser,
            agenda,
            default_intervals,
        }
    }

    pub fn parser(&self) -> &Arc<dyn AgendaParser> {
        &self.parser
    }

    /// Parse every source in order.
    ///
    /// A failing source is logged and skipped; only an empty source list or
    /// every source failing is an error. `now` anchors repeater projection.
    pub async fn collect(
        &self,
        sources: &[PathBuf],
        now: DateTime<Local>,
    ) -> Result<CollectionReport, CollectionError> {
        if sources.is_empty() {
            return Err(CollectionError::NoSources);
        }

        let mut report = CollectionReport::default();
        let mut seen: HashSet<EventKey> = HashSet::new();

        for source in sources {
            let candidates = match self.parser.parse(source).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(source = %source.display(), error = %e, "Agenda source failed");
                    report.failed_sources.push(e);
                    continue;
                }
            };

            debug!(
                source = %source.display(),
                candidates = candidates.len(),
                "Agenda source parsed"
            );

            for candidate in candidates {
                if self.agenda.is_done_marker(&candidate.state_marker) {
                    continue;
                }

                match self.to_event(candidate, &now) {
                    Some(event) => {
                        if seen.insert(event.key().clone()) {
                            report.events.push(event);
                        }
                    }
                    None => report.dropped_candidates += 1,
                }
            }
        }

        if report.failed_sources.len() == sources.len() {
            return Err(CollectionError::AllSourcesFailed {
                count: sources.len(),
            });
        }

        Ok(report)
    }

    /// Normalize one candidate. Returns None when no timestamp survives.
    pub fn to_event(&self, candidate: RawCandidate, now: &DateTime<Local>) -> Option<Event> {
        if candidate.title.trim().is_empty() {
            debug!("Candidate without a title dropped");
            return None;
        }

        let times: Vec<EventTime> = candidate
            .raw_timestamps
            .iter()
            .filter_map(|raw| match normalize_timestamp(raw) {
                Ok(time) => Some(project_repeater(time, now)),
                Err(e) => {
                    debug!(title = %candidate.title, error = %e, "Timestamp dropped");
                    None
                }
            })
            .collect();

        if times.is_empty() {
            debug!(title = %candidate.title, "Candidate has no usable timestamp");
            return None;
        }

        let intervals = self.intervals_for(&candidate);
        Event::new(candidate.title, times, EventState::Active, intervals)
    }

    fn intervals_for(&self, candidate: &RawCandidate) -> Vec<IntervalTier> {
        let property = &self.agenda.interval_property;
        let Some(value) = candidate.properties.get(property) else {
            return self.default_intervals.clone();
        };

        match parse_ladder(value) {
            Ok(ladder) => ladder,
            Err(e) => {
                warn!(
                    title = %candidate.title,
                    property = %property,
                    error = %e,
                    "Invalid interval ladder, using default"
                );
                self.default_intervals.clone()
            }
        }
    }
}

/// Parse a ladder property such as `"60:low 30 5:high"`.
///
/// Tokens are separated by whitespace or commas; severity defaults to medium.
pub fn parse_ladder(value: &str) -> Result<Vec<IntervalTier>, String> {
    let mut tiers = Vec::new();

    for token in value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        let (minutes, severity) = match token.split_once(':') {
            Some((m, s)) => (m, s.parse::<Severity>().map_err(|e| e.to_string())?),
            None => (token, Severity::Medium),
        };
        let minutes: i64 = minutes
            .parse()
            .map_err(|_| format!("'{}' is not a number of minutes", minutes))?;
        if minutes < 0 {
            return Err(format!("negative threshold {}", minutes));
        }
        tiers.push(IntervalTier::new(minutes, severity));
    }

    if tiers.is_empty() {
        return Err("no tiers".into());
    }
    Ok(tiers)
}

/// Move a repeating timestamp that started before today to its first
/// occurrence on or after the start of today
fn project_repeater(mut time: EventTime, now: &DateTime<Local>) -> EventTime {
    let Some(repeater) = time.repeater else {
        return time;
    };
    let today = start_of_day(now);
    if time.instant >= today {
        return time;
    }

    let mut naive = time.instant.naive_local();
    for _ in 0..MAX_REPEAT_STEPS {
        let Some(next) = repeater.step(naive) else {
            return time;
        };
        naive = next;
        let instant = local_from_naive(naive);
        if instant >= today {
            time.instant = instant;
            return time;
        }
    }

    time
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use orgalert_api::default_ladder;
    use orgalert_host_api::MockParser;
    use std::path::Path;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 4, 2, 12, 0, 0).unwrap()
    }

    fn collector(parser: Arc<MockParser>) -> EventCollector {
        EventCollector::new(parser, AgendaSettings::default(), default_ladder())
    }

    fn candidate(title: &str, state: &str, ts: &[&str]) -> RawCandidate {
        RawCandidate::new(title, state, ts.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn test_filters_done_and_untimed() {
        let parser = Arc::new(MockParser::new());
        parser.set_candidates(
            "/org/work.org",
            vec![
                candidate("Standup", "TODO", &["<2025-04-02 Wed 14:00>"]),
                candidate("Shipped", "DONE", &["<2025-04-02 Wed 15:00>"]),
                candidate("Dropped", "CANCELLED", &["<2025-04-02 Wed 15:00>"]),
                candidate("No time", "TODO", &["garbage"]),
                candidate("Untracked", "", &["<2025-04-03>"]),
            ],
        );

        let report = collector(parser)
            .collect(&[PathBuf::from("/org/work.org")], now())
            .await
            .unwrap();

        let titles: Vec<&str> = report.events.iter().map(|e| e.title()).collect();
        assert_eq!(titles, vec!["Standup", "Untracked"]);
        assert_eq!(report.dropped_candidates, 1);
        assert!(report.events.iter().all(|e| e.state() == EventState::Active));
    }

    #[tokio::test]
    async fn test_partial_source_failure() {
        let parser = Arc::new(MockParser::new());
        parser.set_unreadable("/org/broken.org", "permission denied");
        parser.set_candidates(
            "/org/work.org",
            vec![candidate("Standup", "TODO", &["<2025-04-02 Wed 14:00>"])],
        );

        let report = collector(parser)
            .collect(
                &[PathBuf::from("/org/broken.org"), PathBuf::from("/org/work.org")],
                now(),
            )
            .await
            .unwrap();

        assert_eq!(report.events.len(), 1);
        assert_eq!(report.failed_sources.len(), 1);
        assert_eq!(report.failed_sources[0].path(), Path::new("/org/broken.org"));
    }

    #[tokio::test]
    async fn test_total_failure() {
        let parser = Arc::new(MockParser::new());
        parser.set_malformed("/org/a.org", "bad");
        let c = collector(parser);

        assert!(matches!(
            c.collect(&[PathBuf::from("/org/a.org")], now()).await,
            Err(CollectionError::AllSourcesFailed { count: 1 })
        ));
        assert!(matches!(
            c.collect(&[], now()).await,
            Err(CollectionError::NoSources)
        ));
    }

    #[tokio::test]
    async fn test_dedup_across_sources_keeps_first() {
        let parser = Arc::new(MockParser::new());
        parser.set_candidates(
            "/org/a.org",
            vec![
                candidate("Standup", "TODO", &["<2025-04-02 Wed 14:00>"]),
                candidate("Review", "TODO", &["<2025-04-02 Wed 16:00>"]),
            ],
        );
        parser.set_candidates(
            "/org/b.org",
            vec![
                candidate("Lunch", "", &["<2025-04-02 Wed 12:30>"]),
                candidate("Standup", "NEXT", &["<2025-04-02 Wed 14:00>"]),
                // Same title, different time: a distinct event
                candidate("Standup", "TODO", &["<2025-04-03 Thu 14:00>"]),
            ],
        );

        let c = collector(parser);
        let sources = [PathBuf::from("/org/a.org"), PathBuf::from("/org/b.org")];
        let first = c.collect(&sources, now()).await.unwrap();
        let keys: Vec<String> = first.events.iter().map(|e| e.key().to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "Standup @ 2025-04-02 14:00",
                "Review @ 2025-04-02 16:00",
                "Lunch @ 2025-04-02 12:30",
                "Standup @ 2025-04-03 14:00",
            ]
        );

        // Idempotent on unchanged input
        let second = c.collect(&sources, now()).await.unwrap();
        assert_eq!(first.events, second.events);
    }

    #[tokio::test]
    async fn test_multiple_timestamps_keep_source_order() {
        let parser = Arc::new(MockParser::new());
        parser.set_candidates(
            "/org/a.org",
            vec![candidate(
                "Report",
                "TODO",
                &["DEADLINE: <2025-04-04 Fri>", "bad", "SCHEDULED: <2025-04-02 Wed 15:00>"],
            )],
        );

        let report = collector(parser)
            .collect(&[PathBuf::from("/org/a.org")], now())
            .await
            .unwrap();
        let event = &report.events[0];
        assert_eq!(event.times().len(), 2);
        assert_eq!(event.times()[0].raw, "DEADLINE: <2025-04-04 Fri>");
        assert_eq!(
            event.earliest().instant,
            Local.with_ymd_and_hms(2025, 4, 2, 15, 0, 0).unwrap()
        );
        assert!(!event.all_day());
    }

    #[test]
    fn test_property_ladder() {
        let c = collector(Arc::new(MockParser::new()));
        let raw = candidate("Flight", "TODO", &["<2025-04-02 Wed 18:00>"])
            .with_property("ALERT_INTERVALS", "120:low, 30 5:high");
        let event = c.to_event(raw, &now()).unwrap();
        assert_eq!(
            event.intervals(),
            &[
                IntervalTier::new(5, Severity::High),
                IntervalTier::new(30, Severity::Medium),
                IntervalTier::new(120, Severity::Low),
            ]
        );

        let raw = candidate("Flight", "TODO", &["<2025-04-02 Wed 18:00>"])
            .with_property("ALERT_INTERVALS", "soon:high");
        let event = c.to_event(raw, &now()).unwrap();
        assert_eq!(event.intervals(), default_ladder().as_slice());
    }

    #[test]
    fn test_parse_ladder_errors() {
        assert!(parse_ladder("").is_err());
        assert!(parse_ladder("-5").is_err());
        assert!(parse_ladder("10:urgent").is_err());
        assert_eq!(parse_ladder("15").unwrap(), vec![IntervalTier::new(15, Severity::Medium)]);
    }

    #[test]
    fn test_repeater_projection() {
        let c = collector(Arc::new(MockParser::new()));

        // Weekly since March: next occurrence on or after today
        let raw = candidate("Sync", "TODO", &["<2025-03-05 Wed 10:00 +1w>"]);
        let event = c.to_event(raw, &now()).unwrap();
        assert_eq!(
            event.earliest().instant,
            Local.with_ymd_and_hms(2025, 4, 2, 10, 0, 0).unwrap()
        );

        // Already today or later: untouched
        let raw = candidate("Sync", "TODO", &["<2025-04-09 Wed 10:00 +1w>"]);
        let event = c.to_event(raw, &now()).unwrap();
        assert_eq!(
            event.earliest().instant,
            Local.with_ymd_and_hms(2025, 4, 9, 10, 0, 0).unwrap()
        );

        // Non-repeating past timestamps stay overdue
        let raw = candidate("Old", "TODO", &["<2025-03-05 Wed 10:00>"]);
        let event = c.to_event(raw, &now()).unwrap();
        assert_eq!(
            event.earliest().instant,
            Local.with_ymd_and_hms(2025, 3, 5, 10, 0, 0).unwrap()
        );
    }
}
