//! Handlers for the export surface.
//!
//! Exports are never started automatically on job completion. Only this
//! explicit surface kicks one off, so ingestion can batch jobs or be
//! retried independently of recognition.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tokio_util::sync::CancellationToken;

use folio_core::error::CoreError;
use folio_core::types::DbId;
use folio_db::repositories::ExportRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/jobs/{id}/exports
///
/// Package the job's results and submit them to the ingestion service.
/// Returns 202 with the export row (including the service handle and
/// the human-followable processing URL) once the submit phase succeeds.
/// Polling and the processing trigger continue in the background.
pub async fn start_export(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let export = state.exporter.submit(job_id).await?;

    if let Some(handle) = export.handle.clone() {
        let exporter = state.exporter.clone();
        let export_id = export.id;
        tokio::spawn(async move {
            if let Err(e) = exporter
                .finalize(export_id, &handle, &CancellationToken::new())
                .await
            {
                tracing::error!(export_id, error = %e, "Export finalize failed");
            }
        });
    }

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: export })))
}

/// GET /api/v1/jobs/{id}/exports
pub async fn list_job_exports(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let exports = ExportRepo::list_by_job(&state.pool, job_id).await?;
    Ok(Json(DataResponse { data: exports }))
}

/// GET /api/v1/exports/{id}
pub async fn get_export(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let export = ExportRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Export",
            id,
        })?;
    Ok(Json(DataResponse { data: export }))
}
