//! Repository for the `jobs` table.
//!
//! A job's state is always derived from its task counts in a single
//! statement ([`JobRepo::refresh_state`]); nothing else writes `state_id`
//! once tasks exist, so the reported status can never drift from the
//! checkpoint store. The CASE expression mirrors
//! `folio_core::job::aggregate_job_state` and the two are asserted
//! against each other in this crate's integration tests.

use sqlx::PgPool;

use folio_core::job::TaskCounts;
use folio_core::status::{JobState, StatusId, TaskState};
use folio_core::types::DbId;

use crate::models::job::{Job, JobListQuery, SubmitJob};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, template_id, input_root, input_files, recursive, state_id, \
    cancel_requested, last_error, submitted_at, completed_at, created_at, \
    updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides persistence and state aggregation for jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create a new pending job. Returns immediately with the job row;
    /// scanning and task enqueue happen afterwards.
    pub async fn submit(pool: &PgPool, input: &SubmitJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (template_id, input_root, input_files, recursive, state_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.template_id)
            .bind(&input.input_root)
            .bind(&input.input_files)
            .bind(input.recursive.unwrap_or(true))
            .bind(JobState::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List jobs with optional state filter and pagination.
    pub async fn list(pool: &PgPool, params: &JobListQuery) -> Result<Vec<Job>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        let query = if params.state_id.is_some() {
            format!(
                "SELECT {COLUMNS} FROM jobs WHERE state_id = $1 \
                 ORDER BY submitted_at DESC LIMIT $2 OFFSET $3"
            )
        } else {
            format!(
                "SELECT {COLUMNS} FROM jobs \
                 ORDER BY submitted_at DESC LIMIT $1 OFFSET $2"
            )
        };

        let mut q = sqlx::query_as::<_, Job>(&query);
        if let Some(sid) = params.state_id {
            q = q.bind(sid);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Whether cancellation has been requested for a job.
    ///
    /// Consulted by the execution engine between steps so in-flight tasks
    /// stop advancing once a job is cancelled.
    pub async fn cancel_requested(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let (requested,): (bool,) =
            sqlx::query_as("SELECT cancel_requested FROM jobs WHERE id = $1")
                .bind(id)
                .fetch_one(pool)
                .await?;
        Ok(requested)
    }

    /// Request cancellation of a job.
    ///
    /// Returns `true` if the job was still cancellable, `false` if it had
    /// already reached a terminal state. Queued tasks are cancelled
    /// separately via `TaskRepo::cancel_queued`.
    pub async fn request_cancel(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET cancel_requested = TRUE, updated_at = NOW() \
             WHERE id = $1 AND state_id NOT IN ($2, $3, $4, $5)",
        )
        .bind(id)
        .bind(JobState::Completed.id())
        .bind(JobState::CompletedWithErrors.id())
        .bind(JobState::Failed.id())
        .bind(JobState::Cancelled.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a job failed before any tasks were enqueued (the input root
    /// could not be scanned). The state aggregation never runs for a job
    /// with zero tasks, so this is the one direct state write besides
    /// `mark_empty_completed`.
    pub async fn mark_scan_failed(
        pool: &PgPool,
        id: DbId,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs \
             SET state_id = $2, last_error = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(JobState::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job completed when its scan produced no matching files.
    pub async fn mark_empty_completed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs \
             SET state_id = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(JobState::Completed.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Recompute a job's state from its task counts in one atomic
    /// statement and return the new state ID.
    ///
    /// Safe under concurrent callers: terminal task counts only grow, and
    /// the aggregation runs inside the UPDATE itself, so the last write
    /// always reflects a complete snapshot rather than a stale in-memory
    /// one.
    pub async fn refresh_state(pool: &PgPool, id: DbId) -> Result<StatusId, sqlx::Error> {
        let query = format!(
            "UPDATE jobs j \
             SET state_id = c.new_state, \
                 completed_at = CASE \
                     WHEN c.new_state IN ({completed}, {cwe}, {failed}, {cancelled}) \
                     THEN COALESCE(j.completed_at, NOW()) \
                     ELSE NULL END, \
                 updated_at = NOW() \
             FROM ( \
                 SELECT CASE \
                     WHEN COUNT(*) = 0 THEN {pending} \
                     WHEN COUNT(*) FILTER (WHERE state_id IN ({t_queued}, {t_running})) > 0 \
                         THEN {running} \
                     WHEN COUNT(*) FILTER (WHERE state_id = {t_succeeded}) > 0 \
                          AND COUNT(*) FILTER (WHERE state_id IN ({t_failed}, {t_cancelled})) > 0 \
                         THEN {cwe} \
                     WHEN COUNT(*) FILTER (WHERE state_id = {t_succeeded}) > 0 THEN {completed} \
                     WHEN COUNT(*) FILTER (WHERE state_id = {t_failed}) > 0 THEN {failed} \
                     ELSE {cancelled} \
                 END AS new_state \
                 FROM file_tasks WHERE job_id = $1 \
             ) c \
             WHERE j.id = $1 \
             RETURNING j.state_id",
            pending = JobState::Pending.id(),
            running = JobState::Running.id(),
            completed = JobState::Completed.id(),
            cwe = JobState::CompletedWithErrors.id(),
            failed = JobState::Failed.id(),
            cancelled = JobState::Cancelled.id(),
            t_queued = TaskState::Queued.id(),
            t_running = TaskState::Running.id(),
            t_succeeded = TaskState::Succeeded.id(),
            t_failed = TaskState::Failed.id(),
            t_cancelled = TaskState::Cancelled.id(),
        );
        let (state_id,): (StatusId,) = sqlx::query_as(&query).bind(id).fetch_one(pool).await?;
        Ok(state_id)
    }

    /// Fetch the live per-state task counts for a job.
    pub async fn task_counts(pool: &PgPool, id: DbId) -> Result<TaskCounts, sqlx::Error> {
        let (queued, running, succeeded, failed, cancelled): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT \
                     COUNT(*) FILTER (WHERE state_id = $2), \
                     COUNT(*) FILTER (WHERE state_id = $3), \
                     COUNT(*) FILTER (WHERE state_id = $4), \
                     COUNT(*) FILTER (WHERE state_id = $5), \
                     COUNT(*) FILTER (WHERE state_id = $6) \
                 FROM file_tasks WHERE job_id = $1",
            )
            .bind(id)
            .bind(TaskState::Queued.id())
            .bind(TaskState::Running.id())
            .bind(TaskState::Succeeded.id())
            .bind(TaskState::Failed.id())
            .bind(TaskState::Cancelled.id())
            .fetch_one(pool)
            .await?;

        Ok(TaskCounts {
            queued,
            running,
            succeeded,
            failed,
            cancelled,
        })
    }
}
