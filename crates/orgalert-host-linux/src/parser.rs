//! Agenda parser backed by an external command
//!
//! The command is run as `argv... <source>` and must print one JSON object
//! per line on stdout:
//!
//! ```json
//! {"title": "Standup", "state_marker": "TODO", "raw_timestamps": ["<2025-04-02 Wed 09:00>"]}
//! ```

use async_trait::async_trait;
use orgalert_api::RawCandidate;
use orgalert_config::ParserSettings;
use orgalert_host_api::{AgendaParser, SourceError, SourceResult};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs an external program per source and decodes its NDJSON output
#[derive(Debug, Clone)]
pub struct CommandParser {
    program: String,
    args: Vec<String>,
}

impl CommandParser {
    /// Returns None when `argv` is empty
    pub fn new(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn from_settings(settings: &ParserSettings) -> Option<Self> {
        Self::new(&settings.command)
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl AgendaParser for CommandParser {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    async fn parse(&self, source: &Path) -> SourceResult<Vec<RawCandidate>> {
        debug!(program = %self.program, source = %source.display(), "Running agenda parser");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                SourceError::unreadable(source, format!("failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => format!("{} exited with {}", self.program, output.status),
                message => message.to_string(),
            };
            return Err(SourceError::unreadable(source, reason));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| SourceError::malformed(source, format!("output is not UTF-8: {}", e)))?;
        decode_candidates(source, &stdout)
    }
}

/// Decode NDJSON parser output; blank lines are ignored
pub fn decode_candidates(source: &Path, output: &str) -> SourceResult<Vec<RawCandidate>> {
    output
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<RawCandidate>(line)
                .map_err(|e| SourceError::malformed(source, format!("line {}: {}", index + 1, e)))
        })
        .collect()
}
