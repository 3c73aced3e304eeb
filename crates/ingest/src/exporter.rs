//! Export orchestration: package a finished job, submit it, and finish
//! the handshake.
//!
//! The submit phase runs synchronously so the caller gets back a handle
//! and processing URL; the poll-and-trigger phase runs afterwards (the
//! API spawns it) and records a distinct terminal export state for each
//! way the handshake can end.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use folio_core::error::CoreError;
use folio_core::status::{ExportState, JobState};
use folio_core::types::DbId;
use folio_db::models::export::Export;
use folio_db::repositories::{ExportRepo, JobRepo, TaskRepo, TemplateRepo};
use folio_db::DbPool;
use folio_events::{EventBus, EventKind, PipelineEvent};

use crate::client::{IngestError, IngestionService};
use crate::package::{PackageBuilder, PackageError};
use crate::poller::{poll_until_terminal, PollConfig, PollOutcome};

/// Errors surfaced by the export surface.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to build package: {0}")]
    Package(#[from] PackageError),

    #[error("Ingestion submit failed: {0}")]
    Ingest(#[from] IngestError),
}

/// Drives exports against the ingestion service.
pub struct Exporter {
    pool: DbPool,
    service: Arc<dyn IngestionService>,
    bus: Arc<EventBus>,
    poll: PollConfig,
    package_dir: PathBuf,
}

impl Exporter {
    pub fn new(
        pool: DbPool,
        service: Arc<dyn IngestionService>,
        bus: Arc<EventBus>,
        poll: PollConfig,
        package_dir: PathBuf,
    ) -> Self {
        Self {
            pool,
            service,
            bus,
            poll,
            package_dir,
        }
    }

    /// Build and submit a delivery package for a finished job.
    ///
    /// The job must be `Completed` or `CompletedWithErrors` with at least
    /// one succeeded task. On success the export row is in `Submitted`
    /// with the handle and processing URL recorded; drive the rest of the
    /// handshake with [`finalize`](Self::finalize).
    pub async fn submit(&self, job_id: DbId) -> Result<Export, ExportError> {
        let job = JobRepo::find_by_id(&self.pool, job_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Job",
                id: job_id,
            })?;

        let exportable = [JobState::Completed.id(), JobState::CompletedWithErrors.id()]
            .contains(&job.state_id);
        if !exportable {
            return Err(CoreError::Conflict(format!(
                "Job {job_id} has not finished; nothing to export"
            ))
            .into());
        }

        let tasks = TaskRepo::list_succeeded(&self.pool, job_id).await?;
        if tasks.is_empty() {
            return Err(CoreError::Conflict(format!(
                "Job {job_id} has no successful results to export"
            ))
            .into());
        }

        let template = TemplateRepo::find_by_id(&self.pool, job.template_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "ChainTemplate",
                id: job.template_id,
            })?;

        let export = ExportRepo::create(&self.pool, job_id).await?;

        let package_dir = self.package_dir.clone();
        let export_id = export.id;
        let built = tokio::task::spawn_blocking(move || {
            PackageBuilder::build(&package_dir, export_id, job_id, &template, &tasks)
        })
        .await
        .map_err(|e| CoreError::Internal(format!("Package build aborted: {e}")))??;

        ExportRepo::mark_packaged(&self.pool, export.id, &built.path.display().to_string())
            .await?;

        let receipt = match self.service.submit(&built.path, &built.manifest).await {
            Ok(receipt) => receipt,
            Err(e) => {
                ExportRepo::mark_terminal(
                    &self.pool,
                    export.id,
                    ExportState::Failed,
                    0,
                    Some(&e.to_string()),
                )
                .await?;
                return Err(e.into());
            }
        };

        ExportRepo::mark_submitted(
            &self.pool,
            export.id,
            &receipt.handle,
            receipt.processing_url.as_deref(),
        )
        .await?;

        tracing::info!(
            job_id,
            export_id = export.id,
            handle = %receipt.handle,
            "Package submitted to ingestion service"
        );
        self.bus.publish(
            PipelineEvent::new(EventKind::ExportSubmitted)
                .with_job(job_id)
                .with_payload(serde_json::json!({
                    "export_id": export.id,
                    "handle": receipt.handle,
                })),
        );

        let export = ExportRepo::find_by_id(&self.pool, export.id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Export",
                id: export.id,
            })?;
        Ok(export)
    }

    /// Poll a submitted export to a terminal state, then trigger
    /// processing.
    pub async fn finalize(
        &self,
        export_id: DbId,
        handle: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        let export = ExportRepo::find_by_id(&self.pool, export_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Export",
                id: export_id,
            })?;

        let outcome = poll_until_terminal(&*self.service, handle, &self.poll, cancel).await;
        match outcome {
            PollOutcome::Ready { attempts } => match self.service.trigger(handle).await {
                Ok(()) => {
                    ExportRepo::mark_terminal(
                        &self.pool,
                        export_id,
                        ExportState::Delivered,
                        attempts as i32,
                        None,
                    )
                    .await?;
                    tracing::info!(export_id, handle, "Export delivered and processing triggered");
                    self.bus.publish(
                        PipelineEvent::new(EventKind::ExportDelivered)
                            .with_job(export.job_id)
                            .with_payload(serde_json::json!({ "export_id": export_id })),
                    );
                }
                Err(e) => {
                    ExportRepo::mark_terminal(
                        &self.pool,
                        export_id,
                        ExportState::Failed,
                        attempts as i32,
                        Some(&format!("Processing trigger failed: {e}")),
                    )
                    .await?;
                }
            },
            PollOutcome::Rejected { attempts, detail } => {
                ExportRepo::mark_terminal(
                    &self.pool,
                    export_id,
                    ExportState::Rejected,
                    attempts as i32,
                    detail.as_deref(),
                )
                .await?;
                tracing::warn!(export_id, handle, ?detail, "Ingestion rejected the package");
                self.bus.publish(
                    PipelineEvent::new(EventKind::ExportRejected)
                        .with_job(export.job_id)
                        .with_payload(serde_json::json!({
                            "export_id": export_id,
                            "detail": detail,
                        })),
                );
            }
            PollOutcome::TimedOut { attempts } => {
                ExportRepo::mark_terminal(
                    &self.pool,
                    export_id,
                    ExportState::PollTimeout,
                    attempts as i32,
                    Some("Status polling exceeded the attempt budget"),
                )
                .await?;
                tracing::warn!(export_id, handle, attempts, "Status polling timed out");
                self.bus.publish(
                    PipelineEvent::new(EventKind::ExportTimedOut)
                        .with_job(export.job_id)
                        .with_payload(serde_json::json!({
                            "export_id": export_id,
                            "attempts": attempts,
                        })),
                );
            }
            PollOutcome::Cancelled { attempts } => {
                // Shutdown mid-handshake: leave the export in Submitted so
                // a later finalize can pick the handle back up.
                tracing::info!(export_id, handle, attempts, "Export finalize cancelled");
            }
        }

        Ok(())
    }
}
