// src/pipeline/scheduler.rs

//! Periodic ingestion.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::pipeline::{IngestionPipeline, wait_for_shutdown};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Runs the pipeline immediately and then once per interval until shutdown.
///
/// A run that overruns the interval delays the next one rather than queuing
/// extra runs. Failed runs are logged and the schedule carries on.
pub struct Scheduler {
    pipeline: IngestionPipeline,
    interval: Duration,
}

impl Scheduler {
    pub fn new(pipeline: IngestionPipeline, interval: Duration) -> Self {
        Self {
            pipeline,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Drive the schedule. Returns the number of runs started.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> usize {
        log::info!("Scheduling ingestion every {}s", self.interval.as_secs());

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut runs = 0;
        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            runs += 1;
            log::debug!("Starting ingestion run {runs}");
            if let Err(e) = self.pipeline.run(&shutdown).await {
                log::error!("Ingestion run {runs} failed: {e}");
            }
        }

        log::info!("Scheduler stopped after {runs} runs");
        runs
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::ingest::tests::{
        FakeSource, FlakyRepository, RecordingPublisher, settings,
    };

    fn scheduler(source: Arc<FakeSource>) -> Scheduler {
        let pipeline = IngestionPipeline::new(
            source,
            Arc::new(FlakyRepository::default()),
            Arc::new(RecordingPublisher::default()),
            settings(0, 2, 2),
        );
        Scheduler::new(pipeline, Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_interval() {
        let source = Arc::new(FakeSource::new(&[1, 2]));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler(source.clone()).run(rx));

        tokio::time::sleep(Duration::from_secs(150)).await;
        tx.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), 3);
        assert_eq!(*source.lists.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_does_not_stop_schedule() {
        let source = Arc::new(FakeSource::new(&[1]).failing_list());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler(source.clone()).run(rx));

        tokio::time::sleep(Duration::from_secs(90)).await;
        tx.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), 2);
        assert_eq!(*source.lists.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_run_after_shutdown() {
        let source = Arc::new(FakeSource::new(&[1]));
        let (_tx, rx) = watch::channel(true);

        assert_eq!(scheduler(source.clone()).run(rx).await, 0);
        assert_eq!(*source.lists.lock().unwrap(), 0);
    }
}
