//! Repository for the `step_results` table: the per-step checkpoint
//! store.
//!
//! Appends are atomic single-row inserts, and a successful result is
//! unique per `(file_task_id, step_index)` via a partial unique index.
//! Under at-least-once redelivery two workers may race to commit the
//! same step; the first insert wins and the second observes the conflict
//! and adopts the committed row, so divergent outputs are impossible.

use sqlx::PgPool;

use folio_core::types::DbId;

use crate::models::step_result::{NewStepResult, StepResult};

/// Column list for `step_results` queries.
const COLUMNS: &str = "\
    id, file_task_id, step_index, provider, output_text, confidence, \
    error, started_at, finished_at, created_at";

/// Provides append-only persistence for step results.
pub struct StepResultRepo;

impl StepResultRepo {
    /// Append a step result.
    ///
    /// For successful results (`error` is `None`) this is idempotent per
    /// `(file_task_id, step_index)`: if another worker already committed
    /// that step, `Ok(None)` is returned and the caller must adopt the
    /// existing row via [`find_committed`](Self::find_committed). Failed
    /// attempts always insert (they are the audit trail of retries).
    pub async fn append(
        pool: &PgPool,
        result: &NewStepResult,
    ) -> Result<Option<StepResult>, sqlx::Error> {
        let query = format!(
            "INSERT INTO step_results \
                 (file_task_id, step_index, provider, output_text, confidence, \
                  error, started_at, finished_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (file_task_id, step_index) WHERE error IS NULL DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StepResult>(&query)
            .bind(result.file_task_id)
            .bind(result.step_index)
            .bind(&result.provider)
            .bind(&result.output_text)
            .bind(result.confidence)
            .bind(&result.error)
            .bind(result.started_at)
            .bind(result.finished_at)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the committed (successful) result for one step of a task.
    pub async fn find_committed(
        pool: &PgPool,
        file_task_id: DbId,
        step_index: i32,
    ) -> Result<Option<StepResult>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM step_results \
             WHERE file_task_id = $1 AND step_index = $2 AND error IS NULL"
        );
        sqlx::query_as::<_, StepResult>(&query)
            .bind(file_task_id)
            .bind(step_index)
            .fetch_optional(pool)
            .await
    }

    /// List the committed results of a task in step order. This is what
    /// the engine loads to resume after a crash or redelivery.
    pub async fn list_committed(
        pool: &PgPool,
        file_task_id: DbId,
    ) -> Result<Vec<StepResult>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM step_results \
             WHERE file_task_id = $1 AND error IS NULL \
             ORDER BY step_index ASC"
        );
        sqlx::query_as::<_, StepResult>(&query)
            .bind(file_task_id)
            .fetch_all(pool)
            .await
    }

    /// List every result of a task, including failed attempts, in
    /// chronological order. Backs the audit detail of the status surface.
    pub async fn list_by_task(
        pool: &PgPool,
        file_task_id: DbId,
    ) -> Result<Vec<StepResult>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM step_results \
             WHERE file_task_id = $1 \
             ORDER BY step_index ASC, id ASC"
        );
        sqlx::query_as::<_, StepResult>(&query)
            .bind(file_task_id)
            .fetch_all(pool)
            .await
    }

    /// List every result for all tasks of a job, keyed for the per-file
    /// detail view. Ordered by task then step then insertion.
    pub async fn list_by_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<StepResult>, sqlx::Error> {
        let query = format!(
            "SELECT sr.id, sr.file_task_id, sr.step_index, sr.provider, \
                    sr.output_text, sr.confidence, sr.error, sr.started_at, \
                    sr.finished_at, sr.created_at \
             FROM step_results sr \
             JOIN file_tasks ft ON ft.id = sr.file_task_id \
             WHERE ft.job_id = $1 \
             ORDER BY sr.file_task_id ASC, sr.step_index ASC, sr.id ASC"
        );
        sqlx::query_as::<_, StepResult>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
