//! Shared types for the orgalert data model

use chrono::{DateTime, Duration as ChronoDuration, Local, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown severity '{0}' (expected low, medium or high)")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" | "normal" => Ok(Severity::Medium),
            "high" | "critical" => Ok(Severity::High),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

/// One rung of an alert ladder: fire when the event is at most
/// `threshold_minutes` away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalTier {
    pub threshold_minutes: i64,
    pub severity: Severity,
}

impl IntervalTier {
    pub fn new(threshold_minutes: i64, severity: Severity) -> Self {
        Self {
            threshold_minutes,
            severity,
        }
    }
}

/// The ladder used when neither the event nor the configuration supplies one
pub fn default_ladder() -> Vec<IntervalTier> {
    vec![IntervalTier::new(10, Severity::Medium)]
}

/// Sort a ladder ascending by threshold and drop repeated thresholds
/// (the first occurrence wins).
pub fn normalize_ladder(tiers: Vec<IntervalTier>) -> Vec<IntervalTier> {
    let mut ladder: Vec<IntervalTier> = Vec::with_capacity(tiers.len());
    for tier in tiers {
        if !ladder
            .iter()
            .any(|t| t.threshold_minutes == tier.threshold_minutes)
        {
            ladder.push(tier);
        }
    }
    ladder.sort_by_key(|t| t.threshold_minutes);
    ladder
}

/// Completion state of an agenda item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    Active,
    Done,
}

/// Unit of a repeater cookie such as `+1w`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// Recurrence attached to a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repeater {
    pub interval: u32,
    pub unit: RepeatUnit,
}

impl Repeater {
    /// Advance a wall-clock time by one repetition.
    /// Returns None on overflow or a zero interval.
    pub fn step(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        if self.interval == 0 {
            return None;
        }
        let n = self.interval;
        match self.unit {
            RepeatUnit::Hour => from.checked_add_signed(ChronoDuration::hours(n as i64)),
            RepeatUnit::Day => from.checked_add_signed(ChronoDuration::days(n as i64)),
            RepeatUnit::Week => from.checked_add_signed(ChronoDuration::weeks(n as i64)),
            RepeatUnit::Month => from.checked_add_months(Months::new(n)),
            RepeatUnit::Year => from.checked_add_months(Months::new(n.checked_mul(12)?)),
        }
    }
}

/// One normalized timestamp of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
    /// Timestamp text as it appeared in the source
    pub raw: String,
    /// Normalized instant; midnight for all-day timestamps
    pub instant: DateTime<Local>,
    /// True when the timestamp had no usable time of day
    pub all_day: bool,
    pub repeater: Option<Repeater>,
}

/// Stable identity of an event: title plus its earliest instant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub title: String,
    pub instant: DateTime<Local>,
}

impl EventKey {
    pub fn new(title: impl Into<String>, instant: DateTime<Local>) -> Self {
        Self {
            title: title.into(),
            instant,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.title, self.instant.format("%Y-%m-%d %H:%M"))
    }
}

/// Identity of one alert: which event, which tier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertKey {
    pub event: EventKey,
    pub threshold_minutes: i64,
    pub severity: Severity,
}

impl AlertKey {
    pub fn new(event: &EventKey, tier: &IntervalTier) -> Self {
        Self {
            event: event.clone(),
            threshold_minutes: tier.threshold_minutes,
            severity: tier.severity,
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}m/{}]",
            self.event, self.threshold_minutes, self.severity
        )
    }
}

/// A normalized scheduled item.
///
/// Always carries at least one timestamp; construct through [`Event::new`].
/// Deserialization goes through the same constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord")]
pub struct Event {
    key: EventKey,
    times: Vec<EventTime>,
    earliest: usize,
    state: EventState,
    intervals: Vec<IntervalTier>,
}

impl Event {
    /// Build an event. Returns None when `times` is empty.
    ///
    /// `intervals` is normalized (ascending, unique thresholds); an empty
    /// ladder falls back to [`default_ladder`].
    pub fn new(
        title: impl Into<String>,
        times: Vec<EventTime>,
        state: EventState,
        intervals: Vec<IntervalTier>,
    ) -> Option<Self> {
        let earliest = times
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| t.instant)
            .map(|(i, _)| i)?;

        let intervals = if intervals.is_empty() {
            default_ladder()
        } else {
            normalize_ladder(intervals)
        };

        Some(Self {
            key: EventKey::new(title, times[earliest].instant),
            times,
            earliest,
            state,
            intervals,
        })
    }

    pub fn title(&self) -> &str {
        &self.key.title
    }

    pub fn key(&self) -> &EventKey {
        &self.key
    }

    /// Timestamps in source order
    pub fn times(&self) -> &[EventTime] {
        &self.times
    }

    /// The timestamp that drives alerting
    pub fn earliest(&self) -> &EventTime {
        &self.times[self.earliest]
    }

    pub fn all_day(&self) -> bool {
        self.earliest().all_day
    }

    pub fn state(&self) -> EventState {
        self.state
    }

    /// Alert ladder, ascending by threshold
    pub fn intervals(&self) -> &[IntervalTier] {
        &self.intervals
    }
}

/// Wire form of an [`Event`]; `earliest` is recomputed rather than trusted
#[derive(Deserialize)]
struct EventRecord {
    key: EventKey,
    times: Vec<EventTime>,
    state: EventState,
    intervals: Vec<IntervalTier>,
}

impl TryFrom<EventRecord> for Event {
    type Error = String;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let event = Event::new(record.key.title, record.times, record.state, record.intervals)
            .ok_or_else(|| "event has no timestamps".to_string())?;
        if event.key.instant != record.key.instant {
            return Err(format!(
                "event key instant {} does not match its earliest timestamp",
                record.key.instant
            ));
        }
        Ok(event)
    }
}

/// A candidate record as produced by an agenda parser, before filtering
/// and normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub title: String,
    /// TODO keyword or similar; empty when the entry has none
    #[serde(default)]
    pub state_marker: String,
    #[serde(default)]
    pub raw_timestamps: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl RawCandidate {
    pub fn new(
        title: impl Into<String>,
        state_marker: impl Into<String>,
        raw_timestamps: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            state_marker: state_marker.into(),
            raw_timestamps,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
