// src/pipeline/ingest.rs

//! Top stories ingestion.
//!
//! One run lists the top story ids, then fans every id out to a fixed-size
//! worker pool. Each worker fetches the story, inserts it if new and
//! publishes an event only for rows it actually created. Item failures end
//! that item only; the run reports them in its [`RunSummary`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::watch;

use crate::error::Result;
use crate::models::{Config, ItemOutcome, RunSummary, StoryEvent, StoryId, StoryRecord};
use crate::pipeline::{WorkerPool, is_shutdown, wait_for_shutdown};
use crate::services::{EventPublisher, StorySource};
use crate::storage::{InsertOutcome, StoryRepository};

/// Tunables for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Top stories per run; 0 means all
    pub fetch_limit: usize,
    pub max_workers: usize,
    pub max_capacity: usize,
    /// Subject story events are published to
    pub subject: String,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            fetch_limit: config.source.fetch_limit,
            max_workers: config.workers.max_workers,
            max_capacity: config.workers.max_capacity,
            subject: config.broker.subject.clone(),
        }
    }
}

/// Fetch → store → publish pipeline over injected collaborators.
#[derive(Clone)]
pub struct IngestionPipeline {
    source: Arc<dyn StorySource>,
    repository: Arc<dyn StoryRepository>,
    publisher: Arc<dyn EventPublisher>,
    settings: PipelineSettings,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn StorySource>,
        repository: Arc<dyn StoryRepository>,
        publisher: Arc<dyn EventPublisher>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            repository,
            publisher,
            settings,
        }
    }

    /// Execute one run.
    ///
    /// Only a failure to fetch the top stories list is returned as an error.
    /// Once `shutdown` turns true no further ids are started; items already
    /// in flight run to completion.
    pub async fn run(&self, shutdown: &watch::Receiver<bool>) -> Result<RunSummary> {
        if is_shutdown(shutdown) {
            log::info!("Shutdown requested, skipping ingestion run");
            return Ok(RunSummary::default());
        }

        let started = Instant::now();
        let ids = self
            .source
            .fetch_top_ids(self.settings.fetch_limit)
            .await
            .inspect_err(|e| log::error!("Failed to fetch top story ids: {e}"))?;

        log::info!(
            "Ingesting {} top stories with {} workers",
            ids.len(),
            self.settings.max_workers
        );

        let mut summary = RunSummary::new(ids.len());
        let worker = ItemWorker {
            source: Arc::clone(&self.source),
            repository: Arc::clone(&self.repository),
            publisher: Arc::clone(&self.publisher),
            subject: Arc::from(self.settings.subject.as_str()),
            shutdown: shutdown.clone(),
        };
        let pool = WorkerPool::spawn(
            self.settings.max_workers,
            self.settings.max_capacity,
            move |id: StoryId| worker.clone().handle(id),
        );

        let mut abandoned = Vec::new();
        let mut signal = shutdown.clone();
        let mut pending = ids.into_iter();
        while let Some(id) = pending.next() {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut signal) => {
                    abandoned.push(id);
                    abandoned.extend(pending.by_ref());
                }
                submitted = pool.submit(id) => {
                    if let Err(id) = submitted {
                        log::error!("Story {id}: worker pool closed, item not processed");
                        abandoned.push(id);
                    }
                }
            }
        }

        for outcome in pool.join().await {
            summary.record(&outcome);
        }
        if !abandoned.is_empty() {
            log::info!("Shutdown requested, {} stories not started", abandoned.len());
        }
        for id in abandoned {
            summary.record(&ItemOutcome::Cancelled(id));
        }

        if summary.completed() != summary.listed {
            log::warn!("Run accounted for {} of {} stories", summary.completed(), summary.listed);
        }
        log::info!(
            "Ingestion run finished in {:.1}s: {} listed, {} inserted, {} published, {} duplicates, {} failed, {} cancelled",
            started.elapsed().as_secs_f64(),
            summary.listed,
            summary.inserted,
            summary.published,
            summary.duplicates,
            summary.failures(),
            summary.cancelled
        );

        Ok(summary)
    }
}

/// Per-item work, cloned into every pool job.
#[derive(Clone)]
struct ItemWorker {
    source: Arc<dyn StorySource>,
    repository: Arc<dyn StoryRepository>,
    publisher: Arc<dyn EventPublisher>,
    subject: Arc<str>,
    shutdown: watch::Receiver<bool>,
}

impl ItemWorker {
    async fn handle(self, id: StoryId) -> ItemOutcome {
        if is_shutdown(&self.shutdown) {
            log::debug!("Story {id}: cancelled before start");
            return ItemOutcome::Cancelled(id);
        }

        match AssertUnwindSafe(self.process(id)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                log::error!("Story {id}: worker panicked");
                ItemOutcome::Panicked(id)
            }
        }
    }

    async fn process(&self, id: StoryId) -> ItemOutcome {
        let story = match self.source.fetch_story(id).await {
            Ok(story) => story,
            Err(e) => {
                log::warn!("Story {id}: fetch failed: {e}");
                return ItemOutcome::FetchFailed(id);
            }
        };

        let record = match StoryRecord::try_from(story) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Story {id}: unusable payload: {e}");
                return ItemOutcome::FetchFailed(id);
            }
        };

        let stored = match self.repository.insert_if_new(&record).await {
            Ok(InsertOutcome::Inserted(stored)) => stored,
            Ok(InsertOutcome::AlreadyExists) => {
                log::debug!("Story {id}: already stored");
                return ItemOutcome::Duplicate(id);
            }
            Err(e) => {
                log::warn!("Story {id}: insert failed: {e}");
                return ItemOutcome::PersistFailed(id);
            }
        };

        let event = StoryEvent::from(&stored);
        match self.publisher.publish(&self.subject, &event).await {
            Ok(()) => {
                log::info!("Story {id}: stored and published");
                ItemOutcome::Published(id)
            }
            Err(e) => {
                log::warn!("Story {id}: stored but event not published: {e}");
                ItemOutcome::PublishFailed(id)
            }
        }
    }
}
