//! The worker's claim-and-execute loop.
//!
//! Backpressure is a per-worker semaphore: the loop never holds more
//! dequeued-but-unresolved envelopes than the configured concurrency,
//! suspending on the semaphore (and on the queue itself) rather than
//! dropping or buffering work.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use folio_core::types::DbId;
use folio_pipeline::{ChainEngine, TaskQueue};

/// One worker process's execution loop.
pub struct WorkerRuntime {
    queue: TaskQueue,
    engine: Arc<ChainEngine>,
    worker_id: DbId,
    concurrency: usize,
}

impl WorkerRuntime {
    pub fn new(
        queue: TaskQueue,
        engine: Arc<ChainEngine>,
        worker_id: DbId,
        concurrency: usize,
    ) -> Self {
        Self {
            queue,
            engine,
            worker_id,
            concurrency,
        }
    }

    /// Run until cancelled, then drain in-flight tasks.
    pub async fn run(&self, cancel: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut inflight: JoinSet<()> = JoinSet::new();

        loop {
            // Reap finished executions so the set does not grow unbounded.
            while let Some(result) = inflight.try_join_next() {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Task execution panicked");
                }
            }

            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.expect("semaphore is never closed")
                }
            };

            let envelope = match self.queue.dequeue(self.worker_id, &cancel).await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => {
                    // Cancelled while waiting for work.
                    drop(permit);
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim from the queue");
                    drop(permit);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            tracing::info!(
                task_id = envelope.task_id,
                job_id = envelope.job_id,
                file_path = %envelope.file_path,
                retry_count = envelope.retry_count,
                "Claimed file task"
            );

            let engine = Arc::clone(&self.engine);
            inflight.spawn(async move {
                let _permit = permit;
                match engine.process(&envelope).await {
                    Ok(outcome) => {
                        tracing::debug!(
                            task_id = envelope.task_id,
                            outcome = ?outcome,
                            "Task resolved"
                        );
                    }
                    Err(e) => {
                        // Leave the lease to expire; the task will be
                        // redelivered and resume from its checkpoints.
                        tracing::error!(
                            task_id = envelope.task_id,
                            error = %e,
                            "Task execution failed before resolution"
                        );
                    }
                }
            });
        }

        if !inflight.is_empty() {
            tracing::info!(
                inflight = inflight.len(),
                "Draining in-flight tasks before shutdown"
            );
        }
        while let Some(result) = inflight.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Task execution panicked during drain");
            }
        }
    }
}
