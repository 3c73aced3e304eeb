//! Handlers for job submission, status, and cancellation.
//!
//! Submission is asynchronous acceptance: the job row comes back
//! immediately and the folder scan plus task enqueue run in a background
//! task. Status is derived entirely from the checkpoint store, so a
//! poller always sees the latest durable state and completed counts
//! never move backwards.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use folio_core::error::CoreError;
use folio_core::types::DbId;
use folio_db::models::file_task::FileTask;
use folio_db::models::job::{JobListQuery, JobStatus, SubmitJob};
use folio_db::models::step_result::StepResult;
use folio_db::repositories::{EventRepo, JobRepo, StepResultRepo, TaskRepo, TemplateRepo};
use folio_events::{EventKind, PipelineEvent};
use folio_pipeline::dispatch;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// One file task with its full step history, for the detail view.
#[derive(Debug, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: FileTask,
    pub steps: Vec<StepResult>,
}

/// POST /api/v1/jobs
///
/// Accept a job and return its id immediately; scanning and enqueueing
/// happen in the background.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(payload): Json<SubmitJob>,
) -> AppResult<impl IntoResponse> {
    // Exactly one input kind: a folder to scan or an explicit file list.
    match (&payload.input_root, &payload.input_files) {
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either input_root or input_files must be provided".to_string(),
            ))
        }
        (Some(_), Some(_)) => {
            return Err(AppError::BadRequest(
                "input_root and input_files are mutually exclusive".to_string(),
            ))
        }
        (None, Some(files)) if files.is_empty() => {
            return Err(AppError::BadRequest(
                "input_files must not be empty".to_string(),
            ))
        }
        _ => {}
    }

    // The template must exist up front; everything else is async.
    TemplateRepo::find_by_id(&state.pool, payload.template_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ChainTemplate",
            id: payload.template_id,
        })?;

    let job = JobRepo::submit(&state.pool, &payload).await?;
    tracing::info!(
        job_id = job.id,
        input_root = job.input_root.as_deref().unwrap_or(""),
        input_files = job.input_files.as_ref().map_or(0, Vec::len),
        "Job accepted"
    );

    state.event_bus.publish(
        PipelineEvent::new(EventKind::JobSubmitted)
            .with_job(job.id)
            .with_payload(json!({ "template_id": job.template_id })),
    );

    let pool = state.pool.clone();
    let bus = state.event_bus.clone();
    let background_job = job.clone();
    tokio::spawn(async move {
        let job_id = background_job.id;
        if let Err(e) = dispatch::expand_job(pool, bus, background_job).await {
            tracing::error!(job_id, error = %e, "Job expansion failed");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job })))
}

/// GET /api/v1/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = JobRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
///
/// The job row plus live per-state task counts.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Job", id })?;
    let counts = JobRepo::task_counts(&state.pool, id).await?;

    Ok(Json(DataResponse {
        data: JobStatus {
            job,
            total_tasks: counts.total(),
            counts,
        },
    }))
}

/// GET /api/v1/jobs/{id}/tasks
///
/// Full per-file, per-step detail, derived from the checkpoint store.
pub async fn job_tasks(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Job", id })?;

    let tasks = TaskRepo::list_by_job(&state.pool, id).await?;
    let all_steps = StepResultRepo::list_by_job(&state.pool, id).await?;

    let mut by_task: std::collections::HashMap<DbId, Vec<StepResult>> =
        std::collections::HashMap::new();
    for step in all_steps {
        by_task.entry(step.file_task_id).or_default().push(step);
    }

    let details: Vec<TaskDetail> = tasks
        .into_iter()
        .map(|task| {
            let steps = by_task.remove(&task.id).unwrap_or_default();
            TaskDetail { task, steps }
        })
        .collect();

    Ok(Json(DataResponse { data: details }))
}

/// GET /api/v1/jobs/{id}/events
pub async fn job_events(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Job", id })?;

    let events = EventRepo::list_by_job(&state.pool, id).await?;
    Ok(Json(DataResponse { data: events }))
}

/// POST /api/v1/jobs/{id}/cancel
///
/// Stops further dequeues for the job and cancels everything still
/// queued. Running tasks notice the request between steps; their
/// in-flight provider calls are bounded by the step timeout.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Job", id })?;

    let cancelled = JobRepo::request_cancel(&state.pool, id).await?;
    if cancelled {
        let cancelled_tasks = TaskRepo::cancel_queued(&state.pool, id).await?;
        JobRepo::refresh_state(&state.pool, id).await?;
        tracing::info!(job_id = id, cancelled_tasks, "Job cancellation requested");
    }

    Ok(Json(DataResponse {
        data: json!({ "cancelled": cancelled }),
    }))
}
