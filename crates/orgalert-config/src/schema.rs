//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Which agenda sources to scan and how to read them
    #[serde(default)]
    pub agenda: RawAgendaConfig,

    /// Refresh cadence and lookahead
    #[serde(default)]
    pub schedule: RawScheduleConfig,

    /// Fallback alert ladder for events without their own
    #[serde(default)]
    pub default_intervals: Option<Vec<RawInterval>>,

    #[serde(default)]
    pub parser: RawParserConfig,

    #[serde(default)]
    pub notifier: RawNotifierConfig,

    #[serde(default)]
    pub display: RawDisplayConfig,
}

/// Agenda source settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAgendaConfig {
    /// Source files; `~/` is expanded
    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// State markers treated as completed (default: DONE, CANCELLED, CANCELED)
    pub done_keywords: Option<Vec<String>>,

    /// Property holding a per-event ladder (default: ALERT_INTERVALS)
    pub interval_property: Option<String>,
}

/// Scheduling settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawScheduleConfig {
    pub lookahead_minutes: Option<i64>,
    pub refresh_period_seconds: Option<u64>,
    pub startup_delay_seconds: Option<u64>,
    /// Cap for validation-failure backoff
    pub max_backoff_seconds: Option<u64>,
    /// +/- fraction applied to backoff delays
    pub jitter_ratio: Option<f64>,
}

/// One alert ladder tier
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawInterval {
    /// Minutes before the event
    pub minutes: i64,

    /// Severity: "low", "medium", "high"
    #[serde(default = "default_severity")]
    pub severity: String,
}

fn default_severity() -> String {
    "medium".to_string()
}

/// External parser command
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawParserConfig {
    /// argv; the source path is appended as the last argument
    pub command: Option<Vec<String>>,
}

/// Desktop notifier command
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotifierConfig {
    pub command: Option<String>,
    pub app_name: Option<String>,
}

/// Display surface settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDisplayConfig {
    pub summary_max_items: Option<usize>,

    /// File rewritten with the summary on every publication
    pub status_file: Option<PathBuf>,
}
