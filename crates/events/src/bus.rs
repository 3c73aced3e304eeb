//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for
//! [`PipelineEvent`]s. It is designed to be shared via `Arc<EventBus>`
//! across the API server and the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use folio_core::types::DbId;

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The closed set of pipeline event kinds.
///
/// Closed (rather than free-form strings) so that subscribers can match
/// exhaustively; [`EventKind::as_str`] provides the dot-separated name
/// used in the `pipeline_events` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JobSubmitted,
    TasksEnqueued,
    TaskStarted,
    StepCompleted,
    TaskRequeued,
    TaskSucceeded,
    TaskFailed,
    TaskCancelled,
    JobFinished,
    ExportSubmitted,
    ExportDelivered,
    ExportRejected,
    ExportTimedOut,
}

impl EventKind {
    /// Dot-separated event name, e.g. `"task.succeeded"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JobSubmitted => "job.submitted",
            Self::TasksEnqueued => "job.tasks_enqueued",
            Self::TaskStarted => "task.started",
            Self::StepCompleted => "task.step_completed",
            Self::TaskRequeued => "task.requeued",
            Self::TaskSucceeded => "task.succeeded",
            Self::TaskFailed => "task.failed",
            Self::TaskCancelled => "task.cancelled",
            Self::JobFinished => "job.finished",
            Self::ExportSubmitted => "export.submitted",
            Self::ExportDelivered => "export.delivered",
            Self::ExportRejected => "export.rejected",
            Self::ExportTimedOut => "export.timed_out",
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// A progress event emitted by the pipeline.
///
/// Constructed via [`PipelineEvent::new`] and enriched with the builder
/// methods [`with_job`](PipelineEvent::with_job),
/// [`with_task`](PipelineEvent::with_task),
/// [`with_step`](PipelineEvent::with_step), and
/// [`with_payload`](PipelineEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// What happened.
    pub kind: EventKind,

    /// The job the event belongs to, when applicable.
    pub job_id: Option<DbId>,

    /// The file task the event belongs to, when applicable.
    pub task_id: Option<DbId>,

    /// The chain step index the event belongs to, when applicable.
    pub step_index: Option<i32>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    /// Create a new event with only the required kind.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            job_id: None,
            task_id: None,
            step_index: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the job the event belongs to.
    pub fn with_job(mut self, job_id: DbId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    /// Attach the file task the event belongs to.
    pub fn with_task(mut self, task_id: DbId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Attach the chain step index the event belongs to.
    pub fn with_step(mut self, step_index: i32) -> Self {
        self.step_index = Some(step_index);
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`PipelineEvent`].
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    /// The persistence layer (when subscribed) ensures database capture.
    pub fn publish(&self, event: PipelineEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
