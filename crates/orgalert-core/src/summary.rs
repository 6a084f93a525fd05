//! Rendering of the display summary and alert messages

use chrono::{DateTime, Local};
use orgalert_api::{Event, UpcomingEvent};
use orgalert_util::{format_clock_time, format_minutes};

use crate::delta_minutes;

const MINUTES_PER_DAY: i64 = 24 * 60;
const ITEM_SEPARATOR: &str = " | ";

/// Events inside the lookahead window, sorted by instant.
///
/// An event is in window when `delta_minutes <= lookahead_minutes`; overdue
/// events always are.
pub fn upcoming_events(
    events: &[Event],
    now: &DateTime<Local>,
    lookahead_minutes: i64,
) -> Vec<UpcomingEvent> {
    let mut upcoming: Vec<UpcomingEvent> = events
        .iter()
        .filter_map(|event| {
            let delta = delta_minutes(event, now);
            (delta <= lookahead_minutes).then(|| UpcomingEvent {
                key: event.key().clone(),
                instant: event.earliest().instant,
                all_day: event.all_day(),
                delta_minutes: delta,
            })
        })
        .collect();

    // Stable sort keeps collection order for equal instants
    upcoming.sort_by_key(|e| e.instant);
    upcoming
}

/// One-line summary for status bars, e.g. `09:00 Standup | Review (all day) +2 more`.
///
/// An empty window renders as an empty string.
pub fn render_summary(upcoming: &[UpcomingEvent], max_items: usize) -> String {
    let shown: Vec<String> = upcoming.iter().take(max_items).map(render_item).collect();
    let mut summary = shown.join(ITEM_SEPARATOR);

    let hidden = upcoming.len().saturating_sub(max_items);
    if hidden > 0 {
        summary.push_str(&format!(" +{} more", hidden));
    }

    summary
}

fn render_item(event: &UpcomingEvent) -> String {
    match (event.all_day, event.is_overdue()) {
        (true, false) => format!("{} (all day)", event.title()),
        (true, true) => format!("{} (overdue)", event.title()),
        (false, false) => format!("{} {}", format_clock_time(&event.instant), event.title()),
        (false, true) => format!(
            "{} {} (overdue)",
            format_clock_time(&event.instant),
            event.title()
        ),
    }
}

/// Message body for an alert about `event`
pub fn alert_message(event: &Event, delta_minutes: i64, now: &DateTime<Local>) -> String {
    let instant = event.earliest().instant;

    if event.all_day() {
        let days = delta_minutes.div_euclid(MINUTES_PER_DAY);
        return match days {
            0 => "Due today".to_string(),
            1 => "Due tomorrow".to_string(),
            d if d > 1 => format!("Due in {} days", d),
            _ => format!("Overdue since {}", instant.format("%Y-%m-%d")),
        };
    }

    if delta_minutes > 0 {
        format!(
            "Due in {} (at {})",
            format_minutes(delta_minutes),
            format_clock_time(&instant)
        )
    } else if delta_minutes == 0 {
        format!("Due now (at {})", format_clock_time(&instant))
    } else if instant.date_naive() == now.date_naive() {
        format!("Overdue since {}", format_clock_time(&instant))
    } else {
        format!("Overdue since {}", instant.format("%Y-%m-%d %H:%M"))
    }
}
