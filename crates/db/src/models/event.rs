//! Pipeline event entity model.

use folio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `pipeline_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PipelineEventRow {
    pub id: DbId,
    pub event_type: String,
    pub job_id: Option<DbId>,
    pub file_task_id: Option<DbId>,
    pub step_index: Option<i32>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
