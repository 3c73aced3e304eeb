//! Worker-facing facade over the Postgres task queue.
//!
//! `dequeue` suspends until an envelope is available or the worker is
//! cancelled; the underlying claim is a `FOR UPDATE SKIP LOCKED` update
//! in `TaskRepo`, so any number of workers on any number of machines can
//! share the queue. Claims carry a lease; expired leases are returned to
//! the queue by [`TaskQueue::reclaim_expired`], which the worker
//! heartbeat runs periodically.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use folio_core::retry::DEFAULT_LEASE_SECS;
use folio_core::types::DbId;
use folio_db::models::file_task::TaskEnvelope;
use folio_db::repositories::TaskRepo;
use folio_db::DbPool;

/// Tunables for queue claiming.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How long a claim stays leased before it is eligible for redelivery.
    pub lease: Duration,
    /// How long to sleep between claim attempts when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(DEFAULT_LEASE_SECS),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Shared handle to the distributed task queue.
#[derive(Clone)]
pub struct TaskQueue {
    pool: DbPool,
    config: QueueConfig,
}

impl TaskQueue {
    pub fn new(pool: DbPool, config: QueueConfig) -> Self {
        Self { pool, config }
    }

    /// Lease seconds used for claims and extensions.
    pub fn lease_secs(&self) -> f64 {
        self.config.lease.as_secs_f64()
    }

    /// Attempt to claim the next due envelope without waiting.
    pub async fn try_claim(&self, worker_id: DbId) -> Result<Option<TaskEnvelope>, sqlx::Error> {
        TaskRepo::claim_next(&self.pool, worker_id, self.lease_secs()).await
    }

    /// Claim the next envelope, suspending until one is available or the
    /// token is cancelled. Returns `None` only on cancellation.
    pub async fn dequeue(
        &self,
        worker_id: DbId,
        cancel: &CancellationToken,
    ) -> Result<Option<TaskEnvelope>, sqlx::Error> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if let Some(envelope) = self.try_claim(worker_id).await? {
                return Ok(Some(envelope));
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Return expired-lease tasks to the queue. Returns how many were
    /// reclaimed.
    pub async fn reclaim_expired(&self) -> Result<u64, sqlx::Error> {
        TaskRepo::reclaim_expired(&self.pool).await
    }

    /// Extend the leases of everything a worker currently holds.
    pub async fn extend_leases(&self, worker_id: DbId) -> Result<u64, sqlx::Error> {
        TaskRepo::extend_leases(&self.pool, worker_id, self.lease_secs()).await
    }
}

/// Apply ±20% jitter to a redelivery delay so a burst of transient
/// failures does not come back as a synchronized burst of retries.
pub fn jittered(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let factor = rand::rng().random_range(0.8..1.2);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_secs(10);
        for _ in 0..100 {
            let j = jittered(base);
            assert!(j >= Duration::from_secs(8), "{j:?}");
            assert!(j < Duration::from_secs(12), "{j:?}");
        }
    }

    #[test]
    fn zero_delay_is_not_jittered() {
        assert_eq!(jittered(Duration::ZERO), Duration::ZERO);
    }
}
