//! Published views of the agenda for display consumers

use chrono::{DateTime, Local};
use orgalert_util::CycleId;
use serde::{Deserialize, Serialize};

use crate::EventKey;

/// An ACTIVE event inside the lookahead window at publication time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingEvent {
    pub key: EventKey,
    pub instant: DateTime<Local>,
    pub all_day: bool,
    /// Minutes until due at publication time (calendar-day based for all-day events)
    pub delta_minutes: i64,
}

impl UpcomingEvent {
    pub fn title(&self) -> &str {
        &self.key.title
    }

    pub fn is_overdue(&self) -> bool {
        self.delta_minutes < 0
    }
}

/// Immutable result of one successful refresh cycle.
///
/// Replaced as a whole on publication, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaSnapshot {
    /// Cycle that produced this snapshot; None before the first publication
    pub cycle_id: Option<CycleId>,
    pub generated_at: Option<DateTime<Local>>,
    /// Rendered one-line summary for status lines
    pub summary: String,
    /// In-window events sorted by instant
    pub upcoming: Vec<UpcomingEvent>,
}

impl AgendaSnapshot {
    /// Whether any cycle has published yet
    pub fn is_published(&self) -> bool {
        self.cycle_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_snapshot_is_unpublished() {
        let snapshot = AgendaSnapshot::default();
        assert!(!snapshot.is_published());
        assert!(snapshot.summary.is_empty());
        assert!(snapshot.upcoming.is_empty());
    }

    #[test]
    fn overdue_flag_follows_delta() {
        let instant = Local.with_ymd_and_hms(2025, 4, 2, 9, 0, 0).unwrap();
        let mut event = UpcomingEvent {
            key: EventKey::new("Standup", instant),
            instant,
            all_day: false,
            delta_minutes: -5,
        };
        assert!(event.is_overdue());
        event.delta_minutes = 0;
        assert!(!event.is_overdue());
        assert_eq!(event.title(), "Standup");
    }
}
