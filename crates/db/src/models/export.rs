//! Export entity model tracking the ingestion handshake for one job.

use folio_core::status::StatusId;
use folio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `exports` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Export {
    pub id: DbId,
    pub job_id: DbId,
    pub state_id: StatusId,
    pub package_path: Option<String>,
    pub handle: Option<String>,
    pub processing_url: Option<String>,
    pub attempts: i32,
    pub detail: Option<String>,
    pub submitted_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
