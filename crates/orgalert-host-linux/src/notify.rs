//! Desktop notifications through `notify-send`

use async_trait::async_trait;
use orgalert_api::Severity;
use orgalert_config::NotifierSettings;
use orgalert_host_api::{AlertPresenter, PresentationError};
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Presents alerts with a `notify-send` compatible command
#[derive(Debug, Clone)]
pub struct NotifySendPresenter {
    command: String,
    app_name: String,
}

impl NotifySendPresenter {
    pub fn new(command: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            app_name: app_name.into(),
        }
    }

    pub fn from_settings(settings: &NotifierSettings) -> Self {
        Self::new(settings.command.clone(), settings.app_name.clone())
    }
}

/// Map a severity onto a freedesktop notification urgency
pub fn urgency(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "low",
        Severity::Medium => "normal",
        Severity::High => "critical",
    }
}

#[async_trait]
impl AlertPresenter for NotifySendPresenter {
    async fn present(
        &self,
        title: &str,
        message: &str,
        severity: Severity,
    ) -> Result<(), PresentationError> {
        debug!(command = %self.command, title, severity = %severity, "Presenting alert");

        let status = Command::new(&self.command)
            .arg("--app-name")
            .arg(&self.app_name)
            .arg("--urgency")
            .arg(urgency(severity))
            .arg(title)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => PresentationError::Unavailable(self.command.clone()),
                _ => PresentationError::Io(e),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(PresentationError::Failed(format!(
                "{} exited with {}",
                self.command, status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_mapping() {
        assert_eq!(urgency(Severity::Low), "low");
        assert_eq!(urgency(Severity::Medium), "normal");
        assert_eq!(urgency(Severity::High), "critical");
    }

    #[tokio::test]
    async fn test_command_outcomes() {
        let ok = NotifySendPresenter::new("true", "orgalert");
        assert!(ok.present("Standup", "Due in 10 minutes", Severity::Medium).await.is_ok());

        let failing = NotifySendPresenter::new("false", "orgalert");
        assert!(matches!(
            failing.present("Standup", "x", Severity::Low).await,
            Err(PresentationError::Failed(_))
        ));

        let missing = NotifySendPresenter::new("orgalert-no-such-notifier-xyz", "orgalert");
        assert!(matches!(
            missing.present("Standup", "x", Severity::High).await,
            Err(PresentationError::Unavailable(_))
        ));
    }
}
