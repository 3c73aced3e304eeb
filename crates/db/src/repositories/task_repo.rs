//! Repository for the `file_tasks` table: the distributed task queue.
//!
//! Claiming uses `SELECT ... FOR UPDATE SKIP LOCKED` so any number of
//! worker processes can pull from the same queue without double-dispatch.
//! Delivery is at-least-once: a claim carries a lease, and leases that
//! expire (worker crash, network partition) make the task claimable
//! again. The execution engine is checkpoint-idempotent, so redelivery is
//! safe by construction.

use sqlx::PgPool;

use folio_core::status::TaskState;
use folio_core::types::DbId;

use crate::models::file_task::{FileTask, NewFileTask, TaskEnvelope};

/// Column list for `file_tasks` queries.
const COLUMNS: &str = "\
    id, job_id, file_path, file_size_bytes, state_id, retry_count, \
    last_error, failed_step_index, output_text, claimed_by, \
    lease_expires_at, next_attempt_at, created_at, updated_at";

/// Provides queue and checkpoint-store operations for file tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Enqueue a batch of file tasks for a job. Returns the number of
    /// rows inserted; duplicates of `(job_id, file_path)` are skipped so
    /// a re-run of the scan never enqueues the same file twice.
    pub async fn enqueue_batch(
        pool: &PgPool,
        job_id: DbId,
        tasks: &[NewFileTask],
    ) -> Result<u64, sqlx::Error> {
        if tasks.is_empty() {
            return Ok(0);
        }

        let paths: Vec<&str> = tasks.iter().map(|t| t.file_path.as_str()).collect();
        let sizes: Vec<i64> = tasks.iter().map(|t| t.file_size_bytes).collect();

        let result = sqlx::query(
            "INSERT INTO file_tasks (job_id, file_path, file_size_bytes, state_id) \
             SELECT $1, path, size, $2 \
             FROM UNNEST($3::text[], $4::bigint[]) AS input (path, size) \
             ON CONFLICT (job_id, file_path) DO NOTHING",
        )
        .bind(job_id)
        .bind(TaskState::Queued.id())
        .bind(&paths)
        .bind(&sizes)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Atomically claim the next due queued task for a worker.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` to prevent double-dispatch across
    /// concurrent workers. Tasks of jobs with a pending cancellation
    /// request are never handed out. The claim holds a lease of
    /// `lease_secs`; if the worker does not resolve the task before the
    /// lease expires, [`reclaim_expired`](Self::reclaim_expired) returns
    /// it to the queue for redelivery.
    pub async fn claim_next(
        pool: &PgPool,
        worker_id: DbId,
        lease_secs: f64,
    ) -> Result<Option<TaskEnvelope>, sqlx::Error> {
        sqlx::query_as::<_, TaskEnvelope>(
            "UPDATE file_tasks ft \
             SET state_id = $2, claimed_by = $1, \
                 lease_expires_at = NOW() + make_interval(secs => $3), \
                 updated_at = NOW() \
             FROM jobs j \
             WHERE ft.id = ( \
                 SELECT t.id FROM file_tasks t \
                 JOIN jobs jj ON jj.id = t.job_id \
                 WHERE t.state_id = $4 \
                   AND t.next_attempt_at <= NOW() \
                   AND jj.cancel_requested = FALSE \
                 ORDER BY t.next_attempt_at ASC, t.id ASC \
                 LIMIT 1 \
                 FOR UPDATE OF t SKIP LOCKED \
             ) \
             AND j.id = ft.job_id \
             RETURNING ft.id AS task_id, ft.job_id, j.template_id, \
                       ft.file_path, ft.retry_count",
        )
        .bind(worker_id)
        .bind(TaskState::Running.id())
        .bind(lease_secs)
        .bind(TaskState::Queued.id())
        .fetch_optional(pool)
        .await
    }

    /// Acknowledge a task as succeeded with its aggregate output (the
    /// output of the final step). Idempotent: re-acknowledging an
    /// already-succeeded task is a no-op write of the same values.
    pub async fn mark_succeeded(
        pool: &PgPool,
        task_id: DbId,
        output_text: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE file_tasks \
             SET state_id = $2, output_text = $3, last_error = NULL, \
                 claimed_by = NULL, lease_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(TaskState::Succeeded.id())
        .bind(output_text)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Negative-acknowledge a task back onto the queue after a transient
    /// step failure. Increments the retry count and delays the next
    /// delivery by `delay_secs`.
    pub async fn requeue(
        pool: &PgPool,
        task_id: DbId,
        error: &str,
        delay_secs: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE file_tasks \
             SET state_id = $2, retry_count = retry_count + 1, last_error = $3, \
                 next_attempt_at = NOW() + make_interval(secs => $4), \
                 claimed_by = NULL, lease_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(TaskState::Queued.id())
        .bind(error)
        .bind(delay_secs)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a task failed with the failing step's index and error.
    pub async fn mark_failed(
        pool: &PgPool,
        task_id: DbId,
        failed_step_index: Option<i32>,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE file_tasks \
             SET state_id = $2, last_error = $3, failed_step_index = $4, \
                 claimed_by = NULL, lease_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(TaskState::Failed.id())
        .bind(error)
        .bind(failed_step_index)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark one in-flight task cancelled.
    pub async fn mark_cancelled(pool: &PgPool, task_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE file_tasks \
             SET state_id = $2, claimed_by = NULL, lease_expires_at = NULL, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(TaskState::Cancelled.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Cancel every still-queued task of a job. Running tasks are left to
    /// notice the cancellation request between steps.
    pub async fn cancel_queued(pool: &PgPool, job_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE file_tasks \
             SET state_id = $2, updated_at = NOW() \
             WHERE job_id = $1 AND state_id = $3",
        )
        .bind(job_id)
        .bind(TaskState::Cancelled.id())
        .bind(TaskState::Queued.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Return expired-lease tasks to the queue for redelivery.
    ///
    /// Run periodically by the worker heartbeat loop. Returns the number
    /// of tasks reclaimed.
    pub async fn reclaim_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE file_tasks \
             SET state_id = $1, claimed_by = NULL, lease_expires_at = NULL, \
                 updated_at = NOW() \
             WHERE state_id = $2 AND lease_expires_at IS NOT NULL \
               AND lease_expires_at < NOW()",
        )
        .bind(TaskState::Queued.id())
        .bind(TaskState::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Extend the lease on every task currently claimed by a worker.
    ///
    /// Called from the worker heartbeat so long-running steps are not
    /// reclaimed out from under a live worker.
    pub async fn extend_leases(
        pool: &PgPool,
        worker_id: DbId,
        lease_secs: f64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE file_tasks \
             SET lease_expires_at = NOW() + make_interval(secs => $2), updated_at = NOW() \
             WHERE claimed_by = $1 AND state_id = $3",
        )
        .bind(worker_id)
        .bind(lease_secs)
        .bind(TaskState::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Find a task by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<FileTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM file_tasks WHERE id = $1");
        sqlx::query_as::<_, FileTask>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all tasks of a job in enqueue order. Backs the per-file
    /// detail view of the status surface.
    pub async fn list_by_job(pool: &PgPool, job_id: DbId) -> Result<Vec<FileTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM file_tasks WHERE job_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, FileTask>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// List the succeeded tasks of a job, for export packaging.
    pub async fn list_succeeded(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<FileTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM file_tasks \
             WHERE job_id = $1 AND state_id = $2 ORDER BY id ASC"
        );
        sqlx::query_as::<_, FileTask>(&query)
            .bind(job_id)
            .bind(TaskState::Succeeded.id())
            .fetch_all(pool)
            .await
    }
}
