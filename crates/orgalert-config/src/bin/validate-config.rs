//! Config validation CLI tool
//!
//! Loads an orgalertd configuration file and prints the effective settings,
//! or every validation error.

use orgalert_config::{CURRENT_CONFIG_VERSION, ConfigError, Settings, load_config};
use orgalert_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = std::env::args_os().skip(1);
    let config_path = match (args.next(), args.next()) {
        (None, _) => default_config_path(),
        (Some(path), None) if path != "-h" && path != "--help" => PathBuf::from(path),
        _ => {
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Defaults to {}", default_config_path().display());
            return ExitCode::from(2);
        }
    };

    match load_config(&config_path) {
        Ok(settings) => {
            println!("✓ {} is valid", config_path.display());
            println!();
            print_settings(&settings);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ {} is invalid", config_path.display());
            eprintln!();
            print_error(&e);
            ExitCode::from(1)
        }
    }
}

fn print_settings(settings: &Settings) {
    let schedule = &settings.schedule;
    println!("Schedule:");
    println!("  Lookahead: {} minutes", schedule.lookahead_minutes);
    println!("  Refresh period: {}", format_duration(schedule.refresh_period));
    println!("  Startup delay: {}", format_duration(schedule.startup_delay));
    println!(
        "  Retry backoff: up to {} (jitter {:.0}%)",
        format_duration(schedule.max_backoff),
        schedule.jitter_ratio * 100.0
    );

    println!();
    println!("Default intervals:");
    for tier in &settings.default_intervals {
        println!("  - {} minutes [{}]", tier.threshold_minutes, tier.severity);
    }
    println!("  (per-event override property: {})", settings.agenda.interval_property);
    println!("Done keywords: {}", settings.agenda.done_keywords.join(", "));

    println!();
    println!("Parser: {}", settings.parser.command.join(" "));
    println!("Notifier: {} ({})", settings.notifier.command, settings.notifier.app_name);
    match &settings.display.status_file {
        Some(path) => println!("Status file: {}", path.display()),
        None => println!("Status file: disabled"),
    }

    println!();
    if settings.agenda.sources.is_empty() {
        println!("Sources: none configured (refreshes will fail validation)");
    } else {
        println!("Sources:");
        for source in &settings.agenda.sources {
            let marker = if source.exists() { "" } else { " (missing)" };
            println!("  - {}{}", source.display(), marker);
        }
    }
}

fn print_error(error: &ConfigError) {
    match error {
        ConfigError::ReadError(e) => eprintln!("Failed to read file: {}", e),
        ConfigError::ParseError(e) => {
            eprintln!("TOML parse error:");
            eprintln!("  {}", e);
        }
        ConfigError::ValidationFailed { errors } => {
            eprintln!("Validation errors ({}):", errors.len());
            for err in errors {
                eprintln!("  - {}", err);
            }
        }
        ConfigError::UnsupportedVersion(version) => eprintln!(
            "Unsupported config version: {} (expected {})",
            version, CURRENT_CONFIG_VERSION
        ),
    }
}
