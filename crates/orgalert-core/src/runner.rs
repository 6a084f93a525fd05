//! Collection runners - where a collection pass executes

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

use crate::{CollectionError, CollectionReport, EventCollector};

/// Strategy for executing a collection pass.
///
/// The scheduler awaits the returned result and continues with matching once
/// it resolves.
#[async_trait]
pub trait CollectionRunner: Send + Sync {
    async fn run(
        &self,
        collector: Arc<EventCollector>,
        sources: Vec<PathBuf>,
        now: DateTime<Local>,
    ) -> Result<CollectionReport, CollectionError>;
}

/// Runs collection on a separate tokio task so the caller's task stays free
#[derive(Debug, Default, Clone, Copy)]
pub struct BackgroundRunner;

#[async_trait]
impl CollectionRunner for BackgroundRunner {
    async fn run(
        &self,
        collector: Arc<EventCollector>,
        sources: Vec<PathBuf>,
        now: DateTime<Local>,
    ) -> Result<CollectionReport, CollectionError> {
        let handle = tokio::spawn(async move { collector.collect(&sources, now).await });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Collection task failed");
                Err(CollectionError::WorkerFailed(e.to_string()))
            }
        }
    }
}

/// Runs collection directly on the caller's task; for tests and one-shot use
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineRunner;

#[async_trait]
impl CollectionRunner for InlineRunner {
    async fn run(
        &self,
        collector: Arc<EventCollector>,
        sources: Vec<PathBuf>,
        now: DateTime<Local>,
    ) -> Result<CollectionReport, CollectionError> {
        collector.collect(&sources, now).await
    }
}
