//! Handlers for chain template management.
//!
//! Step-list validation happens through `folio_core::chain::validate_steps`,
//! the same function the execution engine calls, so a template that
//! saves here can never fail validation differently at execution time.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use folio_core::chain::{validate_steps, StepSpec};
use folio_core::error::CoreError;
use folio_core::types::DbId;
use folio_db::repositories::TemplateRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Body for `POST /api/v1/templates`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplate {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub steps: Vec<StepSpec>,
}

/// Body for `PUT /api/v1/templates/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateTemplate {
    pub steps: Vec<StepSpec>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/templates
///
/// Validate and persist a new chain template at version 1.
pub async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<CreateTemplate>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    validate_steps(&payload.steps)?;

    let steps = serde_json::to_value(&payload.steps)
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let template = TemplateRepo::create(&state.pool, &payload.name, &steps).await?;

    tracing::info!(template_id = template.id, name = %template.name, "Template created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET /api/v1/templates
pub async fn list_templates(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let templates = TemplateRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let template = TemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ChainTemplate",
            id,
        })?;
    Ok(Json(DataResponse { data: template }))
}

/// PUT /api/v1/templates/{id}
///
/// Templates referenced by a non-terminal job are immutable; an edit is
/// rejected with 409 while any such job exists, and otherwise lands as a
/// brand-new version so in-flight semantics can never change under a
/// running job.
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(payload): Json<UpdateTemplate>,
) -> AppResult<impl IntoResponse> {
    validate_steps(&payload.steps)?;

    let existing = TemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ChainTemplate",
            id,
        })?;

    if TemplateRepo::is_pinned(&state.pool, id).await? {
        return Err(CoreError::Conflict(format!(
            "Template '{}' v{} is referenced by unfinished jobs; wait for them to finish before publishing a new version",
            existing.name, existing.version
        ))
        .into());
    }

    let steps = serde_json::to_value(&payload.steps)
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let template = TemplateRepo::create_version(&state.pool, id, &steps)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ChainTemplate",
            id,
        })?;

    tracing::info!(
        template_id = template.id,
        name = %template.name,
        version = template.version,
        "Template version created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}
