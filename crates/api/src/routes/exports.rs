//! Route definitions for the `/exports` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::exports;
use crate::state::AppState;

/// Routes mounted at `/exports`.
///
/// ```text
/// GET    /{id}        -> get_export
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(exports::get_export))
}
