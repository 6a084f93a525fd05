//! Time utilities for orgalert
//!
//! All agenda instants are wall-clock `DateTime<Local>` values: timestamps in
//! agenda sources carry no zone, so they are read in the process-local zone.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `ORGALERT_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for walking an event through its alert ladder without waiting.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! ORGALERT_MOCK_TIME="2025-12-25 14:30:00" orgalertd
//! ```

use chrono::{
    DateTime, Duration as ChronoDuration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone,
};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "ORGALERT_MOCK_TIME";

const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset between the mocked and the real clock, fixed at first use so that
/// mocked time keeps advancing.
static MOCK_TIME_OFFSET: OnceLock<Option<ChronoDuration>> = OnceLock::new();

/// Parse an `ORGALERT_MOCK_TIME` value into a local instant.
pub fn parse_mock_time(value: &str) -> Option<DateTime<Local>> {
    NaiveDateTime::parse_from_str(value.trim(), MOCK_TIME_FORMAT)
        .ok()
        .map(local_from_naive)
}

#[cfg(debug_assertions)]
#[allow(clippy::disallowed_methods)] // Local::now() is only read here and in now()
fn read_mock_time_offset() -> Option<ChronoDuration> {
    let value = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
    let Some(mock_now) = parse_mock_time(&value) else {
        tracing::warn!(
            mock_time = %value,
            expected_format = MOCK_TIME_FORMAT,
            "Ignoring invalid mock time"
        );
        return None;
    };

    let offset = mock_now.signed_duration_since(Local::now());
    tracing::info!(
        mock_time = %value,
        offset_secs = offset.num_seconds(),
        "Mock time enabled"
    );
    Some(offset)
}

#[cfg(not(debug_assertions))]
fn read_mock_time_offset() -> Option<ChronoDuration> {
    None
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    MOCK_TIME_OFFSET.get_or_init(read_mock_time_offset).is_some()
}

/// Current local time, shifted by `ORGALERT_MOCK_TIME` in debug builds.
#[allow(clippy::disallowed_methods)]
pub fn now() -> DateTime<Local> {
    match MOCK_TIME_OFFSET.get_or_init(read_mock_time_offset) {
        Some(offset) => Local::now() + *offset,
        None => Local::now(),
    }
}

/// Resolve a zone-less wall-clock time in the local zone.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times that
/// fall into a DST gap are moved forward by the gap, the same way a wall clock
/// would read after the change.
pub fn local_from_naive(naive: NaiveDateTime) -> DateTime<Local> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let shifted = naive + ChronoDuration::hours(1);
            match Local.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
                LocalResult::None => Local.from_utc_datetime(&naive),
            }
        }
    }
}

/// Local midnight at the start of the given calendar date.
pub fn start_of_date(date: NaiveDate) -> DateTime<Local> {
    local_from_naive(date.and_time(chrono::NaiveTime::MIN))
}

/// Local midnight at the start of the day containing `dt`.
pub fn start_of_day(dt: &DateTime<Local>) -> DateTime<Local> {
    start_of_date(dt.date_naive())
}

/// Whole minutes from `now` until `instant`, rounded toward negative infinity.
///
/// An instant 30 seconds in the past is `-1`, one 59 seconds ahead is `0`.
pub fn minutes_until(instant: &DateTime<Local>, now: &DateTime<Local>) -> i64 {
    instant
        .signed_duration_since(*now)
        .num_milliseconds()
        .div_euclid(60_000)
}

/// Calendar days from the date of `now` to `date` (negative for past dates).
pub fn days_until(date: NaiveDate, now: &DateTime<Local>) -> i64 {
    date.signed_duration_since(now.date_naive()).num_days()
}

/// Format a DateTime as a clock time for summaries and messages.
pub fn format_clock_time(dt: &DateTime<Local>) -> String {
    dt.format("%H:%M").to_string()
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Format a non-negative minute count as "N minutes" / "1 minute".
pub fn format_minutes(minutes: i64) -> String {
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{} minutes", minutes)
    }
}
