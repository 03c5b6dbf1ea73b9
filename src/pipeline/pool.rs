//! Fixed-size worker pool with a bounded queue.
//!
//! `workers` tasks pull jobs from one bounded channel. When all workers are
//! busy and `capacity` jobs are waiting, [`WorkerPool::submit`] waits for a
//! slot instead of dropping the job. [`WorkerPool::join`] closes the queue,
//! lets the workers drain it and returns every outcome.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// Pool of `workers` tasks applying one handler to submitted jobs.
pub struct WorkerPool<J, R> {
    sender: mpsc::Sender<J>,
    workers: Vec<JoinHandle<Vec<R>>>,
}

impl<J, R> WorkerPool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    /// Spawn the workers. Both sizes are clamped to at least 1.
    pub fn spawn<H, Fut>(workers: usize, capacity: usize, handler: H) -> Self
    where
        H: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);

        let workers = (0..workers.max(1))
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let mut outcomes = Vec::new();
                    loop {
                        // Lock is released before the job runs
                        let job = receiver.lock().await.recv().await;
                        let Some(job) = job else { break };
                        outcomes.push(handler(job).await);
                    }
                    outcomes
                })
            })
            .collect();

        Self { sender, workers }
    }

    /// Queue a job, waiting while the queue is full.
    ///
    /// Gives the job back if every worker has exited.
    pub async fn submit(&self, job: J) -> Result<(), J> {
        self.sender.send(job).await.map_err(|e| e.0)
    }

    /// Close the queue and wait for every queued job to finish.
    pub async fn join(self) -> Vec<R> {
        drop(self.sender);

        let mut outcomes = Vec::new();
        for worker in self.workers {
            match worker.await {
                Ok(done) => outcomes.extend(done),
                Err(e) => log::error!("Worker task failed: {e}"),
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::Semaphore;

    use super::*;

    #[tokio::test]
    async fn test_join_returns_every_outcome() {
        let pool = WorkerPool::spawn(4, 2, |n: u32| async move { n * 2 });
        for n in 0..50 {
            pool.submit(n).await.unwrap();
        }

        let mut outcomes = pool.join().await;
        outcomes.sort_unstable();
        assert_eq!(outcomes, (0..50).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_worker_count() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let pool = {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            WorkerPool::spawn(3, 10, move |_: u32| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                }
            })
        };

        for n in 0..30 {
            pool.submit(n).await.unwrap();
        }
        assert_eq!(pool.join().await.len(), 30);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_submit_blocks_when_full() {
        let gate = Arc::new(Semaphore::new(0));
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();

        let pool = {
            let gate = Arc::clone(&gate);
            WorkerPool::spawn(1, 1, move |n: u32| {
                let gate = Arc::clone(&gate);
                let started_tx = started_tx.clone();
                async move {
                    let _ = started_tx.send(n);
                    let _permit = gate.acquire().await.unwrap();
                    n
                }
            })
        };

        {
            // One job running, one queued: the third must wait
            pool.submit(1).await.unwrap();
            assert_eq!(started_rx.recv().await, Some(1));
            pool.submit(2).await.unwrap();

            let third = pool.submit(3);
            tokio::pin!(third);
            assert!(
                tokio::time::timeout(Duration::from_millis(50), &mut third)
                    .await
                    .is_err()
            );

            gate.add_permits(3);
            third.await.unwrap();
        }

        let mut outcomes = pool.join().await;
        outcomes.sort_unstable();
        assert_eq!(outcomes, vec![1, 2, 3]);
    }
}
