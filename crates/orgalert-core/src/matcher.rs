//! Interval matching - decides which alert tier an event crosses

use chrono::{DateTime, Local};
use orgalert_api::{AlertKey, Event, IntervalTier};
use orgalert_util::{days_until, minutes_until};
use tracing::debug;

use crate::AlertTracker;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minutes until the event's earliest timestamp.
///
/// All-day events count whole calendar days (midnight to midnight), so an
/// all-day event today is `0` all day long.
pub fn delta_minutes(event: &Event, now: &DateTime<Local>) -> i64 {
    let earliest = event.earliest();
    if earliest.all_day {
        days_until(earliest.instant.date_naive(), now) * MINUTES_PER_DAY
    } else {
        minutes_until(&earliest.instant, now)
    }
}

/// Result of matching one event against its ladder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierMatch {
    pub delta_minutes: i64,
    /// The most urgent unfired tier whose threshold has been crossed
    pub fire: Option<IntervalTier>,
    /// Other crossed, unfired tiers; marked fired without presenting
    pub skipped: Vec<IntervalTier>,
}

/// Match an event against its ladder without touching the tracker.
///
/// A tier is crossed when `delta_minutes <= threshold`, so overdue events
/// cross every tier.
pub fn match_event(event: &Event, now: &DateTime<Local>, tracker: &AlertTracker) -> TierMatch {
    let delta = delta_minutes(event, now);

    // Ladder is ascending, so the first unfired crossed tier is the most urgent
    let mut pending = event
        .intervals()
        .iter()
        .filter(|tier| delta <= tier.threshold_minutes)
        .filter(|tier| !tracker.has_fired(&AlertKey::new(event.key(), tier)))
        .copied();

    let fire = pending.next();
    let skipped = pending.collect();

    TierMatch {
        delta_minutes: delta,
        fire,
        skipped,
    }
}

/// An alert selected for presentation
#[derive(Debug, Clone)]
pub struct FiredAlert {
    pub event: Event,
    pub tier: IntervalTier,
    pub delta_minutes: i64,
}

/// Match every event and record the outcome in the tracker.
///
/// Returns the alerts to present, in event order.
pub fn apply_matches(
    events: &[Event],
    now: DateTime<Local>,
    tracker: &mut AlertTracker,
) -> Vec<FiredAlert> {
    let mut fired = Vec::new();

    for event in events {
        let matched = match_event(event, &now, tracker);

        for tier in &matched.skipped {
            debug!(
                event = %event.key(),
                threshold_minutes = tier.threshold_minutes,
                severity = %tier.severity,
                "Alert tier skipped"
            );
            tracker.mark_skipped(AlertKey::new(event.key(), tier), now);
        }

        if let Some(tier) = matched.fire {
            tracker.mark_fired(AlertKey::new(event.key(), &tier), now);
            fired.push(FiredAlert {
                event: event.clone(),
                tier,
                delta_minutes: matched.delta_minutes,
            });
        }
    }

    fired
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use orgalert_api::{EventState, EventTime, Severity};

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 4, 2, 12, 0, 0).unwrap()
    }

    fn event_at(
        title: &str,
        instant: DateTime<Local>,
        all_day: bool,
        ladder: Vec<IntervalTier>,
    ) -> Event {
        Event::new(
            title,
            vec![EventTime {
                raw: String::new(),
                instant,
                all_day,
                repeater: None,
            }],
            EventState::Active,
            ladder,
        )
        .unwrap()
    }

    fn three_tier_ladder() -> Vec<IntervalTier> {
        vec![
            IntervalTier::new(10, Severity::Low),
            IntervalTier::new(30, Severity::Medium),
            IntervalTier::new(60, Severity::High),
        ]
    }

    #[test]
    fn test_delta_minutes_floors() {
        let event = event_at("x", now() + Duration::seconds(90), false, vec![]);
        assert_eq!(delta_minutes(&event, &now()), 1);

        let event = event_at("x", now() - Duration::seconds(30), false, vec![]);
        assert_eq!(delta_minutes(&event, &now()), -1);
    }

    #[test]
    fn test_all_day_uses_calendar_days() {
        let today = Local.with_ymd_and_hms(2025, 4, 2, 0, 0, 0).unwrap();
        let event = event_at("Today", today, true, vec![]);
        assert_eq!(delta_minutes(&event, &now()), 0);

        let tomorrow = Local.with_ymd_and_hms(2025, 4, 3, 0, 0, 0).unwrap();
        let event = event_at("Tomorrow", tomorrow, true, vec![]);
        assert_eq!(delta_minutes(&event, &now()), 1440);

        let yesterday = Local.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        let event = event_at("Yesterday", yesterday, true, vec![]);
        assert_eq!(delta_minutes(&event, &now()), -1440);
    }

    #[test]
    fn test_nothing_crossed_yet() {
        let tracker = AlertTracker::new();
        let event = event_at("Later", now() + Duration::hours(2), false, three_tier_ladder());
        let matched = match_event(&event, &now(), &tracker);
        assert_eq!(matched.fire, None);
        assert!(matched.skipped.is_empty());
    }

    #[test]
    fn test_single_tier_crossed() {
        let tracker = AlertTracker::new();
        let event = event_at("Soon", now() + Duration::minutes(45), false, three_tier_ladder());
        let matched = match_event(&event, &now(), &tracker);
        assert_eq!(matched.fire, Some(IntervalTier::new(60, Severity::High)));
        assert!(matched.skipped.is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let tracker = AlertTracker::new();
        let event = event_at("Edge", now() + Duration::minutes(10), false, vec![]);
        let matched = match_event(&event, &now(), &tracker);
        assert_eq!(matched.fire, Some(IntervalTier::new(10, Severity::Medium)));
    }

    #[test]
    fn test_overdue_collapses_to_most_urgent() {
        let mut tracker = AlertTracker::new();
        let event = event_at("Late", now() - Duration::minutes(90), false, three_tier_ladder());

        let fired = apply_matches(std::slice::from_ref(&event), now(), &mut tracker);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].tier, IntervalTier::new(10, Severity::Low));
        assert_eq!(fired[0].delta_minutes, -90);

        // The other tiers are recorded but were not presented
        assert_eq!(tracker.len(), 3);
        let skipped = AlertKey::new(event.key(), &IntervalTier::new(60, Severity::High));
        assert!(!tracker.get(&skipped).unwrap().presented);

        // Nothing left to fire
        let fired = apply_matches(
            std::slice::from_ref(&event),
            now() + Duration::minutes(1),
            &mut tracker,
        );
        assert!(fired.is_empty());
    }

    #[test]
    fn test_ladder_walk_fires_each_tier_once() {
        let mut tracker = AlertTracker::new();
        let due = now() + Duration::minutes(70);
        let event = event_at("Meeting", due, false, three_tier_ladder());
        let events = vec![event];

        let mut presented = Vec::new();
        for minutes_before in (0..=70).rev() {
            let t = due - Duration::minutes(minutes_before);
            for alert in apply_matches(&events, t, &mut tracker) {
                presented.push(alert.tier.threshold_minutes);
            }
        }

        assert_eq!(presented, vec![60, 30, 10]);
    }
}
