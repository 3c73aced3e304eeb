//! Worker heartbeat and queue maintenance loop.
//!
//! Every tick: refresh this worker's heartbeat, extend the leases it
//! holds, mark workers with stale heartbeats offline, and return
//! expired-lease tasks to the queue so another worker can pick them up.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use folio_core::status::WorkerStatus;
use folio_core::types::DbId;
use folio_core::worker_pool::{HEARTBEAT_CHECK_INTERVAL_SECS, HEARTBEAT_TIMEOUT_SECS};
use folio_db::repositories::WorkerRepo;
use folio_db::DbPool;
use folio_pipeline::TaskQueue;

/// Run the heartbeat loop until cancelled.
pub async fn run_heartbeat(
    pool: DbPool,
    queue: TaskQueue,
    worker_id: DbId,
    cancel: CancellationToken,
) {
    let mut interval =
        tokio::time::interval(Duration::from_secs(HEARTBEAT_CHECK_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        if let Err(e) = WorkerRepo::heartbeat(&pool, worker_id, WorkerStatus::Busy).await {
            tracing::error!(worker_id, error = %e, "Failed to record heartbeat");
            continue;
        }

        match queue.extend_leases(worker_id).await {
            Ok(extended) if extended > 0 => {
                tracing::debug!(worker_id, extended, "Extended task leases");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(worker_id, error = %e, "Failed to extend leases"),
        }

        match WorkerRepo::mark_stale_offline(&pool, HEARTBEAT_TIMEOUT_SECS as f64).await {
            Ok(stale) if stale > 0 => {
                tracing::warn!(stale, "Marked stale workers offline");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Failed to check for stale workers"),
        }

        match queue.reclaim_expired().await {
            Ok(reclaimed) if reclaimed > 0 => {
                tracing::warn!(reclaimed, "Reclaimed expired task leases for redelivery");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Failed to reclaim expired leases"),
        }
    }

    tracing::info!(worker_id, "Heartbeat loop stopped");
}
