//! Status file display surface
//!
//! Keeps a file holding the latest summary line, for status bars that poll.

use orgalert_api::AgendaSnapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Atomically replace `path` with `summary` plus a trailing newline
pub async fn write_status(path: &Path, summary: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, format!("{}\n", summary)).await?;
    tokio::fs::rename(&tmp, path).await
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Rewrite the status file on every published snapshot until the channel closes
pub async fn run_status_writer(path: PathBuf, mut snapshots: watch::Receiver<Arc<AgendaSnapshot>>) {
    loop {
        let snapshot = Arc::clone(&snapshots.borrow_and_update());
        if snapshot.is_published() {
            match write_status(&path, &snapshot.summary).await {
                Ok(()) => debug!(path = %path.display(), "Status file updated"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to write status file"),
            }
        }

        if snapshots.changed().await.is_err() {
            break;
        }
    }
}
