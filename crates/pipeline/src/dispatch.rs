//! Job dispatch: turn an accepted job into queued file tasks.
//!
//! Runs after `POST /jobs` has already returned the job id; acceptance
//! is asynchronous. A job's input set is either a folder to scan or an
//! explicit file list. The folder walk (and the stat pass over explicit
//! lists) happens on a blocking thread; the discovered files are
//! enqueued in chunks and the job state is recomputed once tasks exist.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use folio_db::models::file_task::NewFileTask;
use folio_db::models::job::Job;
use folio_db::repositories::{JobRepo, TaskRepo};
use folio_db::DbPool;
use folio_events::{EventBus, EventKind, PipelineEvent};

use crate::scanner::Scanner;

/// How many tasks are inserted per batch statement.
const ENQUEUE_CHUNK: usize = 500;

/// Scan a job's input root (or take its explicit file list) and enqueue
/// one task per input file.
///
/// Returns the number of tasks enqueued. A scan failure (missing root,
/// permission denied) marks the job failed with the error recorded; an
/// empty input set completes the job immediately. Neither aborts sibling
/// jobs. Files on an explicit list are enqueued as given; one that turns
/// out to be unreadable fails its own task at execution time rather than
/// the whole job.
pub async fn expand_job(
    pool: DbPool,
    bus: Arc<EventBus>,
    job: Job,
) -> Result<u64, sqlx::Error> {
    let files = match gather_inputs(&job).await {
        Ok(files) => files,
        Err(reason) => {
            tracing::warn!(job_id = job.id, error = %reason, "Input scan failed, failing job");
            JobRepo::mark_scan_failed(&pool, job.id, &reason).await?;
            return Ok(0);
        }
    };

    if files.is_empty() {
        tracing::info!(job_id = job.id, "No matching input files, completing job");
        JobRepo::mark_empty_completed(&pool, job.id).await?;
        bus.publish(
            PipelineEvent::new(EventKind::TasksEnqueued)
                .with_job(job.id)
                .with_payload(serde_json::json!({ "count": 0 })),
        );
        return Ok(0);
    }

    let mut enqueued: u64 = 0;
    for chunk in files.chunks(ENQUEUE_CHUNK) {
        enqueued += TaskRepo::enqueue_batch(&pool, job.id, chunk).await?;
    }

    // Tasks exist now; the aggregation takes over the job state.
    JobRepo::refresh_state(&pool, job.id).await?;

    tracing::info!(job_id = job.id, enqueued, "Job expanded into file tasks");
    bus.publish(
        PipelineEvent::new(EventKind::TasksEnqueued)
            .with_job(job.id)
            .with_payload(serde_json::json!({ "count": enqueued })),
    );

    Ok(enqueued)
}

/// Resolve the job's input set into file tasks on a blocking thread.
async fn gather_inputs(job: &Job) -> Result<Vec<NewFileTask>, String> {
    if let Some(paths) = job.input_files.clone() {
        let stat = tokio::task::spawn_blocking(move || {
            paths
                .into_iter()
                .map(|path| {
                    let size = fs::metadata(&path).map(|m| m.len() as i64).unwrap_or(0);
                    NewFileTask {
                        file_path: path,
                        file_size_bytes: size,
                    }
                })
                .collect::<Vec<_>>()
        })
        .await;
        return stat.map_err(|e| format!("Input listing aborted unexpectedly: {e}"));
    }

    let Some(root) = job.input_root.clone() else {
        // Unreachable under the schema's input-present constraint.
        return Err("Job has neither an input root nor an input file list".to_string());
    };
    let recursive = job.recursive;

    let scan = tokio::task::spawn_blocking(move || {
        Scanner::scan(Path::new(&root), recursive).map(|entries| {
            entries
                .map(|entry| NewFileTask {
                    file_path: entry.path.display().to_string(),
                    file_size_bytes: entry.size_bytes as i64,
                })
                .collect::<Vec<_>>()
        })
    })
    .await;

    match scan {
        Ok(Ok(files)) => Ok(files),
        Ok(Err(scan_err)) => Err(scan_err.to_string()),
        Err(join_err) => {
            tracing::error!(job_id = job.id, error = %join_err, "Scan task panicked");
            Err("Input scan aborted unexpectedly".to_string())
        }
    }
}
