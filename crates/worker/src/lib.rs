//! Folio worker: pulls file-task envelopes from the shared queue and
//! executes recognition chains against the checkpoint store.
//!
//! Any number of worker processes (on any number of machines) may run
//! concurrently against the same database; the queue's `SKIP LOCKED`
//! claims and the engine's checkpoint idempotency make that safe.

pub mod config;
pub mod heartbeat;
pub mod runner;

pub use config::WorkerConfig;
pub use runner::WorkerRuntime;
