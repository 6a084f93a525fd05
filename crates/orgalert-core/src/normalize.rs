//! Timestamp normalization
//!
//! Accepted grammar, after an optional `SCHEDULED:` or `DEADLINE:` prefix:
//!
//! ```text
//! <YYYY-MM-DD [Dow] [H:MM[-H:MM]] [+1w | ++1w | .+1w] [-2d]>
//! ```
//!
//! Only the start of a time range is used. A present but unreadable time
//! makes the timestamp all-day rather than failing it.

use chrono::{NaiveDate, NaiveTime};
use orgalert_api::{EventTime, RepeatUnit, Repeater};
use orgalert_util::local_from_naive;
use thiserror::Error;

/// Timestamp errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Malformed timestamp '{raw}': {reason}")]
    MalformedTimestamp { raw: String, reason: String },
}

impl TimestampError {
    fn malformed(raw: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

const PLANNING_PREFIXES: [&str; 2] = ["SCHEDULED:", "DEADLINE:"];

/// Normalize one raw timestamp into a local instant plus all-day flag
pub fn normalize_timestamp(raw: &str) -> Result<EventTime, TimestampError> {
    let mut text = raw.trim();
    for prefix in PLANNING_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim_start();
            break;
        }
    }

    let (body, rest) = text
        .strip_prefix('<')
        .and_then(|t| t.split_once('>'))
        .ok_or_else(|| TimestampError::malformed(raw, "expected <...>"))?;
    if !rest.trim().is_empty() {
        return Err(TimestampError::malformed(
            raw,
            format!("unexpected text after timestamp: '{}'", rest.trim()),
        ));
    }

    let mut tokens = body.split_whitespace();
    let date_token = tokens
        .next()
        .ok_or_else(|| TimestampError::malformed(raw, "missing date"))?;
    let date = NaiveDate::parse_from_str(date_token, "%Y-%m-%d")
        .map_err(|e| TimestampError::malformed(raw, format!("bad date '{}': {}", date_token, e)))?;

    let mut time: Option<NaiveTime> = None;
    let mut saw_time = false;
    let mut repeater = None;

    for token in tokens {
        if token.starts_with('+') || token.starts_with(".+") {
            repeater = repeater.or_else(|| parse_repeater(token));
        } else if token.starts_with('-') {
            // Warning period, irrelevant for alerting
        } else if token.starts_with(|c: char| c.is_ascii_digit()) && !saw_time {
            saw_time = true;
            time = parse_time_of_day(token);
        }
    }

    let naive = date.and_time(time.unwrap_or(NaiveTime::MIN));
    Ok(EventTime {
        raw: raw.to_string(),
        instant: local_from_naive(naive),
        all_day: time.is_none(),
        repeater,
    })
}

/// Parse `H:MM` or the start of `H:MM-H:MM`
fn parse_time_of_day(token: &str) -> Option<NaiveTime> {
    let start = token.split('-').next()?;
    NaiveTime::parse_from_str(start, "%H:%M").ok()
}

/// Parse a repeater cookie: `+1w`, `++2d`, `.+1m`
fn parse_repeater(token: &str) -> Option<Repeater> {
    let cookie = token
        .strip_prefix(".+")
        .or_else(|| token.strip_prefix("++"))
        .or_else(|| token.strip_prefix('+'))?;

    let unit_char = cookie.chars().last()?;
    let unit = match unit_char {
        'h' => RepeatUnit::Hour,
        'd' => RepeatUnit::Day,
        'w' => RepeatUnit::Week,
        'm' => RepeatUnit::Month,
        'y' => RepeatUnit::Year,
        _ => return None,
    };
    let interval: u32 = cookie[..cookie.len() - unit_char.len_utf8()].parse().ok()?;
    if interval == 0 {
        return None;
    }

    Some(Repeater { interval, unit })
}
