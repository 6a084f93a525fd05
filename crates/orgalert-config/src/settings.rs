//! Validated settings structures

use crate::schema::{
    RawAgendaConfig, RawConfig, RawDisplayConfig, RawInterval, RawNotifierConfig,
    RawParserConfig, RawScheduleConfig,
};
use crate::validation::parse_severity;
use orgalert_api::{IntervalTier, Severity, default_ladder, normalize_ladder};
use orgalert_util::expand_home;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LOOKAHEAD_MINUTES: i64 = 24 * 60;
const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(300);
const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(10);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(3600);
const DEFAULT_JITTER_RATIO: f64 = 0.1;
const DEFAULT_INTERVAL_PROPERTY: &str = "ALERT_INTERVALS";
const DEFAULT_PARSER_COMMAND: &str = "orgalert-export";
const DEFAULT_NOTIFIER_COMMAND: &str = "notify-send";
const DEFAULT_APP_NAME: &str = "orgalert";
const DEFAULT_SUMMARY_MAX_ITEMS: usize = 3;

/// Validated settings ready for use by the scheduler and adapters
#[derive(Debug, Clone)]
pub struct Settings {
    pub agenda: AgendaSettings,
    pub schedule: ScheduleSettings,
    /// Fallback ladder, ascending by threshold
    pub default_intervals: Vec<IntervalTier>,
    pub parser: ParserSettings,
    pub notifier: NotifierSettings,
    pub display: DisplaySettings,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let default_intervals = raw
            .default_intervals
            .map(convert_intervals)
            .filter(|ladder| !ladder.is_empty())
            .unwrap_or_else(default_ladder);

        Self {
            agenda: AgendaSettings::from_raw(raw.agenda),
            schedule: ScheduleSettings::from_raw(raw.schedule),
            default_intervals,
            parser: ParserSettings::from_raw(raw.parser),
            notifier: NotifierSettings::from_raw(raw.notifier),
            display: DisplaySettings::from_raw(raw.display),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            agenda: AgendaSettings::default(),
            schedule: ScheduleSettings::default(),
            default_intervals: default_ladder(),
            parser: ParserSettings::default(),
            notifier: NotifierSettings::default(),
            display: DisplaySettings::default(),
        }
    }
}

/// Agenda source settings
#[derive(Debug, Clone)]
pub struct AgendaSettings {
    /// Source paths with `~/` already expanded
    pub sources: Vec<PathBuf>,
    pub done_keywords: Vec<String>,
    pub interval_property: String,
}

impl AgendaSettings {
    fn from_raw(raw: RawAgendaConfig) -> Self {
        let defaults = Self::default();
        Self {
            sources: raw.sources.iter().map(|p| expand_home(p)).collect(),
            done_keywords: raw
                .done_keywords
                .map(|k| k.into_iter().map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.done_keywords),
            interval_property: raw
                .interval_property
                .map(|p| p.trim().to_string())
                .unwrap_or(defaults.interval_property),
        }
    }

    /// Whether a state marker denotes a completed or cancelled item
    pub fn is_done_marker(&self, marker: &str) -> bool {
        let marker = marker.trim();
        !marker.is_empty() && self.done_keywords.iter().any(|k| k == marker)
    }
}

impl Default for AgendaSettings {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            done_keywords: vec!["DONE".into(), "CANCELLED".into(), "CANCELED".into()],
            interval_property: DEFAULT_INTERVAL_PROPERTY.into(),
        }
    }
}

/// Refresh cadence settings
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub lookahead_minutes: i64,
    pub refresh_period: Duration,
    pub startup_delay: Duration,
    pub max_backoff: Duration,
    pub jitter_ratio: f64,
}

impl ScheduleSettings {
    fn from_raw(raw: RawScheduleConfig) -> Self {
        Self {
            lookahead_minutes: raw.lookahead_minutes.unwrap_or(DEFAULT_LOOKAHEAD_MINUTES),
            refresh_period: raw
                .refresh_period_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REFRESH_PERIOD),
            startup_delay: raw
                .startup_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_STARTUP_DELAY),
            max_backoff: raw
                .max_backoff_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_MAX_BACKOFF),
            jitter_ratio: raw.jitter_ratio.unwrap_or(DEFAULT_JITTER_RATIO),
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            lookahead_minutes: DEFAULT_LOOKAHEAD_MINUTES,
            refresh_period: DEFAULT_REFRESH_PERIOD,
            startup_delay: DEFAULT_STARTUP_DELAY,
            max_backoff: DEFAULT_MAX_BACKOFF,
            jitter_ratio: DEFAULT_JITTER_RATIO,
        }
    }
}

/// External parser command
#[derive(Debug, Clone)]
pub struct ParserSettings {
    pub command: Vec<String>,
}

impl ParserSettings {
    fn from_raw(raw: RawParserConfig) -> Self {
        raw.command
            .map(|command| Self { command })
            .unwrap_or_default()
    }
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            command: vec![DEFAULT_PARSER_COMMAND.into()],
        }
    }
}

/// Desktop notifier command
#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub command: String,
    pub app_name: String,
}

impl NotifierSettings {
    fn from_raw(raw: RawNotifierConfig) -> Self {
        Self {
            command: raw.command.unwrap_or_else(|| DEFAULT_NOTIFIER_COMMAND.into()),
            app_name: raw.app_name.unwrap_or_else(|| DEFAULT_APP_NAME.into()),
        }
    }
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self::from_raw(RawNotifierConfig::default())
    }
}

/// Display surface settings
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub summary_max_items: usize,
    pub status_file: Option<PathBuf>,
}

impl DisplaySettings {
    fn from_raw(raw: RawDisplayConfig) -> Self {
        Self {
            summary_max_items: raw.summary_max_items.unwrap_or(DEFAULT_SUMMARY_MAX_ITEMS),
            status_file: raw.status_file.map(|p| expand_home(&p)),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self::from_raw(RawDisplayConfig::default())
    }
}

fn convert_intervals(raw: Vec<RawInterval>) -> Vec<IntervalTier> {
    let tiers = raw
        .into_iter()
        .map(|i| {
            let severity = parse_severity(&i.severity).unwrap_or(Severity::Medium);
            IntervalTier::new(i.minutes, severity)
        })
        .collect();
    normalize_ladder(tiers)
}
