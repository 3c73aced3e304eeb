//! Handlers for the worker fleet view.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use folio_db::repositories::WorkerRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workers
pub async fn list_workers(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let workers = WorkerRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: workers }))
}
