//! orgalertd - agenda alert service
//!
//! This is the main entry point for the orgalertd service.
//! It wires together all the components:
//! - Configuration loading
//! - Agenda parser and notification adapters (Linux)
//! - Refresh scheduler
//! - Status file display surface

mod status;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use orgalert_config::{Settings, load_config};
use orgalert_core::{BackgroundRunner, CycleOutcome, RefreshScheduler, SourceSet};
use orgalert_host_api::AgendaParser;
use orgalert_host_linux::{CommandParser, NotifySendPresenter};
use orgalert_util::default_config_path;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// orgalertd - Alerts for upcoming agenda items
#[derive(Parser, Debug)]
#[command(name = "orgalertd")]
#[command(about = "Alerts for upcoming agenda items", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/orgalert/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Status file override (or set ORGALERT_STATUS_FILE env var)
    #[arg(short, long, env = "ORGALERT_STATUS_FILE")]
    status_file: Option<PathBuf>,

    /// Run a single refresh, print the summary and exit
    #[arg(long)]
    once: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    config_path: PathBuf,
    scheduler: Arc<RefreshScheduler>,
    status_file: Option<PathBuf>,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let settings = load_settings(&args.config)?;

        let parser = CommandParser::from_settings(&settings.parser)
            .ok_or_else(|| anyhow!("parser.command is empty"))?;
        if !parser.is_available() {
            warn!(program = parser.program(), "Agenda parser not found on PATH yet");
        }
        let presenter = NotifySendPresenter::from_settings(&settings.notifier);

        let scheduler = RefreshScheduler::new(
            &settings,
            SourceSet::new(settings.agenda.sources.clone()),
            Arc::new(parser),
            Arc::new(presenter),
            Arc::new(BackgroundRunner),
        );

        let status_file = args
            .status_file
            .clone()
            .or_else(|| settings.display.status_file.clone());

        Ok(Self {
            config_path: args.config.clone(),
            scheduler,
            status_file,
        })
    }

    /// Run one cycle immediately and print the resulting summary
    async fn run_once(self) -> Result<()> {
        let outcome = self.scheduler.refresh(orgalert_util::now()).await;
        if let CycleOutcome::Failed { reason, .. } = &outcome {
            return Err(anyhow!("Refresh failed: {:?}", reason));
        }

        let summary = self.scheduler.summary();
        if let Some(path) = &self.status_file {
            status::write_status(path, &summary)
                .await
                .with_context(|| format!("Failed to write status file {:?}", path))?;
        }
        println!("{}", summary);
        Ok(())
    }

    async fn run(self) -> Result<()> {
        let status_writer = self.status_file.clone().map(|path| {
            info!(path = %path.display(), "Status file enabled");
            tokio::spawn(status::run_status_writer(path, self.scheduler.subscribe()))
        });

        let driver = self.scheduler.activate();

        // Set up signal handlers
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;
        let mut sigusr1 = signal(SignalKind::user_defined1())
            .context("Failed to create SIGUSR1 handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                // Signal: SIGTERM or SIGINT - graceful shutdown
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // Signal: SIGHUP - reload agenda sources
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading configuration");
                    self.reload();
                }

                // Signal: SIGUSR1 - refresh now
                _ = sigusr1.recv() => {
                    debug!("Received SIGUSR1, triggering refresh");
                    let cycle = self.scheduler.trigger();
                    tokio::spawn(async move {
                        match cycle.await {
                            Ok(CycleOutcome::Skipped) => info!("Refresh already in progress"),
                            Ok(outcome) => debug!(?outcome, "Manual refresh finished"),
                            Err(e) => error!(error = %e, "Manual refresh task failed"),
                        }
                    });
                }
            }
        }

        // Graceful shutdown
        info!("Shutting down orgalertd");
        self.scheduler.shutdown();

        if let Some(driver) = driver
            && let Err(e) = driver.await
        {
            warn!(error = %e, "Refresh scheduler task failed");
        }
        if let Some(writer) = status_writer {
            writer.abort();
        }

        info!("Shutdown complete");
        Ok(())
    }

    fn reload(&self) {
        match load_settings(&self.config_path) {
            Ok(settings) => {
                // Only the source list is applied live; other settings need a restart
                self.scheduler.reconfigure(settings.agenda.sources);
            }
            Err(e) => {
                error!(error = %e, "Failed to reload configuration, keeping current sources");
            }
        }
    }
}

fn load_settings(path: &Path) -> Result<Settings> {
    let settings = load_config(path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;

    info!(
        config_path = %path.display(),
        sources = settings.agenda.sources.len(),
        lookahead_minutes = settings.schedule.lookahead_minutes,
        "Configuration loaded"
    );
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "orgalertd starting"
    );

    if orgalert_util::is_mock_time_active() {
        warn!("Mock time is active; alerts are computed against the mocked clock");
    }

    let service = Service::new(&args)?;
    if args.once {
        service.run_once().await
    } else {
        service.run().await
    }
}
