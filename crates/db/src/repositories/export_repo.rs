//! Repository for the `exports` table.
//!
//! Tracks one ingestion handshake per row:
//! `pending → packaged → submitted → {delivered, rejected, poll_timeout, failed}`.

use sqlx::PgPool;

use folio_core::status::ExportState;
use folio_core::types::DbId;

use crate::models::export::Export;

/// Column list for `exports` queries.
const COLUMNS: &str = "\
    id, job_id, state_id, package_path, handle, processing_url, attempts, \
    detail, submitted_at, completed_at, created_at, updated_at";

/// Provides persistence for export records.
pub struct ExportRepo;

impl ExportRepo {
    /// Create a new pending export for a job.
    pub async fn create(pool: &PgPool, job_id: DbId) -> Result<Export, sqlx::Error> {
        let query = format!(
            "INSERT INTO exports (job_id, state_id) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Export>(&query)
            .bind(job_id)
            .bind(ExportState::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Record the built package path.
    pub async fn mark_packaged(
        pool: &PgPool,
        export_id: DbId,
        package_path: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE exports \
             SET state_id = $2, package_path = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(export_id)
        .bind(ExportState::Packaged.id())
        .bind(package_path)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a successful submit: the service-assigned handle and the
    /// human-followable processing URL.
    pub async fn mark_submitted(
        pool: &PgPool,
        export_id: DbId,
        handle: &str,
        processing_url: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE exports \
             SET state_id = $2, handle = $3, processing_url = $4, \
                 submitted_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(export_id)
        .bind(ExportState::Submitted.id())
        .bind(handle)
        .bind(processing_url)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a terminal outcome with the poll attempt count and detail.
    pub async fn mark_terminal(
        pool: &PgPool,
        export_id: DbId,
        state: ExportState,
        attempts: i32,
        detail: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE exports \
             SET state_id = $2, attempts = $3, detail = $4, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(export_id)
        .bind(state.id())
        .bind(attempts)
        .bind(detail)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find an export by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Export>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM exports WHERE id = $1");
        sqlx::query_as::<_, Export>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a job's exports, newest first.
    pub async fn list_by_job(pool: &PgPool, job_id: DbId) -> Result<Vec<Export>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM exports WHERE job_id = $1 ORDER BY id DESC"
        );
        sqlx::query_as::<_, Export>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
