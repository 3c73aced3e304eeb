//! Repository for the `pipeline_events` table.

use sqlx::PgPool;

use folio_core::types::DbId;

use crate::models::event::PipelineEventRow;

/// Column list for `pipeline_events` queries.
const COLUMNS: &str =
    "id, event_type, job_id, file_task_id, step_index, payload, created_at";

/// Provides append-only persistence for pipeline events.
pub struct EventRepo;

impl EventRepo {
    /// Insert one event row and return its ID.
    pub async fn insert(
        pool: &PgPool,
        event_type: &str,
        job_id: Option<DbId>,
        file_task_id: Option<DbId>,
        step_index: Option<i32>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO pipeline_events \
                 (event_type, job_id, file_task_id, step_index, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(event_type)
        .bind(job_id)
        .bind(file_task_id)
        .bind(step_index)
        .bind(payload)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    /// List a job's events in publication order.
    pub async fn list_by_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<PipelineEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pipeline_events WHERE job_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, PipelineEventRow>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
