//! Job entity models and DTOs for the recognition pipeline.

use folio_core::job::TaskCounts;
use folio_core::status::StatusId;
use folio_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `jobs` table.
///
/// The input set is either `input_root` (a folder to scan) or
/// `input_files` (an explicit file list); the schema enforces that at
/// least one is present.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub template_id: DbId,
    pub input_root: Option<String>,
    pub input_files: Option<Vec<String>>,
    pub recursive: bool,
    pub state_id: StatusId,
    pub cancel_requested: bool,
    pub last_error: Option<String>,
    pub submitted_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for submitting a new job via `POST /api/v1/jobs`.
///
/// Exactly one of `input_root` and `input_files` must be provided.
#[derive(Debug, Deserialize)]
pub struct SubmitJob {
    pub template_id: DbId,
    /// Folder to scan for input files.
    pub input_root: Option<String>,
    /// Explicit input file list, bypassing the folder scan. Files that
    /// turn out to be unreadable fail individually at execution time.
    pub input_files: Option<Vec<String>>,
    /// Recurse into subdirectories when scanning. Defaults to `true`;
    /// ignored for explicit file lists.
    pub recursive: Option<bool>,
}

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    /// Filter by state ID (e.g. 2 = running, 5 = failed).
    pub state_id: Option<StatusId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Aggregate view returned by the job status surface: the job row plus
/// live per-state task counts derived from the checkpoint store.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    #[serde(flatten)]
    pub job: Job,
    pub counts: TaskCounts,
    pub total_tasks: i64,
}
