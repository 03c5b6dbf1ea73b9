//! Ingestion pipeline.
//!
//! - `WorkerPool`: bounded fan-out of per-item work
//! - `IngestionPipeline`: one fetch → store → publish run
//! - `Scheduler`: repeats runs on a fixed interval

pub mod ingest;
pub mod pool;
pub mod scheduler;

use tokio::sync::watch;

pub use ingest::{IngestionPipeline, PipelineSettings};
pub use pool::WorkerPool;
pub use scheduler::Scheduler;

/// Whether shutdown has been requested.
pub fn is_shutdown(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Resolve once shutdown is requested.
///
/// If the sender is dropped without signalling, this never resolves.
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
