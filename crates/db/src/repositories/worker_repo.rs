//! Repository for the `workers` table.

use sqlx::PgPool;

use folio_core::status::{StatusId, WorkerStatus};
use folio_core::types::DbId;

use crate::models::worker::Worker;

/// Column list for `workers` queries.
const COLUMNS: &str =
    "id, name, status_id, max_concurrency, last_heartbeat_at, registered_at";

/// Provides persistence for the worker registry.
pub struct WorkerRepo;

impl WorkerRepo {
    /// Register a worker by name, or re-register an existing one.
    ///
    /// A worker restarting under the same name reclaims its row: the
    /// status resets to idle, the heartbeat is refreshed, and the
    /// concurrency limit is updated.
    pub async fn register(
        pool: &PgPool,
        name: &str,
        max_concurrency: i32,
    ) -> Result<Worker, sqlx::Error> {
        let query = format!(
            "INSERT INTO workers (name, status_id, max_concurrency) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO UPDATE \
                 SET status_id = $2, max_concurrency = $3, last_heartbeat_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Worker>(&query)
            .bind(name)
            .bind(WorkerStatus::Idle.id())
            .bind(max_concurrency)
            .fetch_one(pool)
            .await
    }

    /// Record a heartbeat for a worker and set its status.
    pub async fn heartbeat(
        pool: &PgPool,
        worker_id: DbId,
        status: WorkerStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE workers SET last_heartbeat_at = NOW(), status_id = $2 WHERE id = $1",
        )
        .bind(worker_id)
        .bind(status.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Set a worker's status without touching the heartbeat (used when
    /// draining and on shutdown).
    pub async fn set_status(
        pool: &PgPool,
        worker_id: DbId,
        status: WorkerStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workers SET status_id = $2 WHERE id = $1")
            .bind(worker_id)
            .bind(status.id())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark workers with stale heartbeats offline. Returns how many were
    /// transitioned.
    pub async fn mark_stale_offline(
        pool: &PgPool,
        timeout_secs: f64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workers SET status_id = $1 \
             WHERE status_id != $1 \
               AND last_heartbeat_at < NOW() - make_interval(secs => $2)",
        )
        .bind(StatusId::from(WorkerStatus::Offline))
        .bind(timeout_secs)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List all registered workers, most recently seen first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Worker>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workers ORDER BY last_heartbeat_at DESC"
        );
        sqlx::query_as::<_, Worker>(&query).fetch_all(pool).await
    }
}
