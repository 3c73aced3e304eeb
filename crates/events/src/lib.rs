//! Folio progress-event infrastructure.
//!
//! Progress reporting is observer-based, never a callback baked into the
//! execution loop: the engine and exporter publish typed
//! [`PipelineEvent`]s on the [`EventBus`], and any number of consumers
//! (the persistence writer, future UIs) subscribe independently.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PipelineEvent`] / [`EventKind`]: the canonical event envelope.
//! - [`EventPersistence`]: background service that durably writes every
//!   event to the `pipeline_events` table.

pub mod bus;
pub mod persistence;

pub use bus::{EventBus, EventKind, PipelineEvent};
pub use persistence::EventPersistence;
