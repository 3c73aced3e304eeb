//! Durable event persistence service.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and writes every received [`PipelineEvent`] to the
//! `pipeline_events` table. It runs as a long-lived background task and
//! shuts down gracefully when the bus sender is dropped.

use tokio::sync::broadcast;

use folio_core::types::DbId;
use folio_db::repositories::EventRepo;
use folio_db::DbPool;

use crate::bus::PipelineEvent;

/// Background service that persists pipeline events to the database.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop.
    ///
    /// Subscribes to the event bus via the provided `receiver` and persists
    /// every event it receives. The loop exits when the channel is closed
    /// (i.e. the [`EventBus`](crate::bus::EventBus) is dropped).
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<PipelineEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            event_type = event.kind.as_str(),
                            "Failed to persist event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    /// Write a single event to the `pipeline_events` table.
    async fn persist(pool: &DbPool, event: &PipelineEvent) -> Result<DbId, sqlx::Error> {
        EventRepo::insert(
            pool,
            event.kind.as_str(),
            event.job_id,
            event.task_id,
            event.step_index,
            &event.payload,
        )
        .await
    }
}
