//! Step result (checkpoint) entity models.

use folio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `step_results` table.
///
/// Immutable once written. A successful result (`error IS NULL`) is
/// unique per `(file_task_id, step_index)`; failed attempts accumulate
/// as additional rows so the retry history stays auditable.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepResult {
    pub id: DbId,
    pub file_task_id: DbId,
    pub step_index: i32,
    pub provider: String,
    pub output_text: Option<String>,
    pub confidence: Option<f64>,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub created_at: Timestamp,
}

/// A new step result to append to a task's checkpoint record.
#[derive(Debug, Clone)]
pub struct NewStepResult {
    pub file_task_id: DbId,
    pub step_index: i32,
    pub provider: String,
    pub output_text: Option<String>,
    pub confidence: Option<f64>,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
}
