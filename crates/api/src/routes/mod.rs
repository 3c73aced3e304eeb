pub mod exports;
pub mod health;
pub mod jobs;
pub mod templates;
pub mod workers;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /templates                     list, create
/// /templates/{id}                get, update (new version)
///
/// /jobs                          list, submit
/// /jobs/{id}                     status (aggregate counts)
/// /jobs/{id}/tasks               per-file, per-step detail
/// /jobs/{id}/events              event log
/// /jobs/{id}/cancel              cancel (POST)
/// /jobs/{id}/exports             list exports, start export (POST)
///
/// /exports/{id}                  export status
///
/// /workers                       worker fleet status
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/templates", templates::router())
        .nest("/jobs", jobs::router())
        .nest("/exports", exports::router())
        .nest("/workers", workers::router())
}
