//! Worker registry entity model.

use folio_core::status::StatusId;
use folio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `workers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Worker {
    pub id: DbId,
    pub name: String,
    pub status_id: StatusId,
    pub max_concurrency: i32,
    pub last_heartbeat_at: Timestamp,
    pub registered_at: Timestamp,
}
