//! Folio pipeline: folder scanning, job dispatch, the distributed task
//! queue facade, and the chain execution engine.
//!
//! The flow: [`dispatch::expand_job`] scans a job's input root and
//! enqueues one file task per matching file; workers pull envelopes
//! through [`queue::TaskQueue`]; each envelope is executed by
//! [`engine::ChainEngine`], which checkpoints every step in the database
//! and resolves the task back through the queue.

pub mod dispatch;
pub mod engine;
pub mod queue;
pub mod scanner;

pub use engine::{ChainEngine, EngineConfig, TaskOutcome};
pub use queue::{QueueConfig, TaskQueue};
pub use scanner::{FileEntry, FolderScan, ScanError, Scanner};
