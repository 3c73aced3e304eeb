//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{exports, jobs};
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                 -> list_jobs
/// POST   /                 -> submit_job
/// GET    /{id}             -> get_job (aggregate counts)
/// GET    /{id}/tasks       -> job_tasks (per-file, per-step detail)
/// GET    /{id}/events      -> job_events
/// POST   /{id}/cancel      -> cancel_job
/// GET    /{id}/exports     -> list_job_exports
/// POST   /{id}/exports     -> start_export
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::submit_job))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/tasks", get(jobs::job_tasks))
        .route("/{id}/events", get(jobs::job_events))
        .route("/{id}/cancel", post(jobs::cancel_job))
        .route(
            "/{id}/exports",
            get(exports::list_job_exports).post(exports::start_export),
        )
}
