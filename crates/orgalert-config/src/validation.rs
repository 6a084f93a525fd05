//! Configuration validation

use crate::schema::{RawConfig, RawInterval};
use orgalert_api::Severity;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Duplicate interval threshold: {0} minutes")]
    DuplicateInterval(i64),

    #[error("Invalid severity '{0}' (expected low, medium or high)")]
    InvalidSeverity(String),
}

impl ValidationError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let schedule = &config.schedule;
    if let Some(lookahead) = schedule.lookahead_minutes
        && lookahead <= 0
    {
        errors.push(ValidationError::invalid(
            "schedule.lookahead_minutes",
            "must be greater than 0",
        ));
    }
    if schedule.refresh_period_seconds == Some(0) {
        errors.push(ValidationError::invalid(
            "schedule.refresh_period_seconds",
            "must be greater than 0",
        ));
    }
    if let Some(jitter) = schedule.jitter_ratio
        && !(0.0..1.0).contains(&jitter)
    {
        errors.push(ValidationError::invalid(
            "schedule.jitter_ratio",
            format!("{} is outside [0, 1)", jitter),
        ));
    }

    if let Some(intervals) = &config.default_intervals {
        errors.extend(validate_intervals(intervals));
    }

    if let Some(keywords) = &config.agenda.done_keywords
        && keywords.iter().any(|k| k.trim().is_empty())
    {
        errors.push(ValidationError::invalid(
            "agenda.done_keywords",
            "keywords cannot be blank",
        ));
    }

    if let Some(property) = &config.agenda.interval_property
        && property.trim().is_empty()
    {
        errors.push(ValidationError::invalid(
            "agenda.interval_property",
            "cannot be blank",
        ));
    }

    if let Some(command) = &config.parser.command
        && command.first().is_none_or(|program| program.trim().is_empty())
    {
        errors.push(ValidationError::invalid(
            "parser.command",
            "command cannot be empty",
        ));
    }

    if let Some(command) = &config.notifier.command
        && command.trim().is_empty()
    {
        errors.push(ValidationError::invalid(
            "notifier.command",
            "command cannot be empty",
        ));
    }

    if config.display.summary_max_items == Some(0) {
        errors.push(ValidationError::invalid(
            "display.summary_max_items",
            "must be greater than 0",
        ));
    }

    errors
}

fn validate_intervals(intervals: &[RawInterval]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for interval in intervals {
        if interval.minutes < 0 {
            errors.push(ValidationError::invalid(
                "default_intervals.minutes",
                format!("{} is negative", interval.minutes),
            ));
        }
        if !seen.insert(interval.minutes) {
            errors.push(ValidationError::DuplicateInterval(interval.minutes));
        }
        if let Err(e) = parse_severity(&interval.severity) {
            errors.push(e);
        }
    }

    errors
}

/// Parse a configured severity name. Only the canonical names are accepted.
pub fn parse_severity(s: &str) -> Result<Severity, ValidationError> {
    match s.trim().to_lowercase().as_str() {
        "low" => Ok(Severity::Low),
        "medium" => Ok(Severity::Medium),
        "high" => Ok(Severity::High),
        _ => Err(ValidationError::InvalidSeverity(s.to_string())),
    }
}
