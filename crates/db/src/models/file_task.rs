//! File task entity models: the unit of queued work pairing one input
//! file with one chain template.

use folio_core::status::StatusId;
use folio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `file_tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FileTask {
    pub id: DbId,
    pub job_id: DbId,
    pub file_path: String,
    pub file_size_bytes: i64,
    pub state_id: StatusId,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub failed_step_index: Option<i32>,
    pub output_text: Option<String>,
    pub claimed_by: Option<DbId>,
    pub lease_expires_at: Option<Timestamp>,
    pub next_attempt_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A new file task to enqueue for a job.
#[derive(Debug, Clone)]
pub struct NewFileTask {
    pub file_path: String,
    pub file_size_bytes: i64,
}

/// The lightweight queue message handed to a worker when it claims a
/// task. Deliberately carries no checkpoint state; the durable record in
/// `file_tasks`/`step_results` is the only authority for resume.
#[derive(Debug, Clone, FromRow)]
pub struct TaskEnvelope {
    pub task_id: DbId,
    pub job_id: DbId,
    pub template_id: DbId,
    pub file_path: String,
    pub retry_count: i32,
}
