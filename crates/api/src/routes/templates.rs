//! Route definitions for the `/templates` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::templates;
use crate::state::AppState;

/// Routes mounted at `/templates`.
///
/// ```text
/// GET    /            -> list_templates
/// POST   /            -> create_template
/// GET    /{id}        -> get_template
/// PUT    /{id}        -> update_template (creates a new version)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/{id}",
            get(templates::get_template).put(templates::update_template),
        )
}
