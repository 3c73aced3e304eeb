//! Export and ingestion adapter.
//!
//! Given a finished job, builds a delivery package (manifest plus the
//! per-file recognition outputs, zipped) and drives the three-phase
//! handshake with the external ingestion service: submit the package,
//! poll its status until terminal, then explicitly trigger processing.
//! Deliberately decoupled from job completion: an export only ever runs
//! on an explicit external trigger, so ingestion can batch jobs or be
//! retried independently of recognition.

pub mod client;
pub mod exporter;
pub mod package;
pub mod poller;

pub use client::{HttpIngestionClient, IngestError, IngestState, IngestStatus, IngestionService, SubmitReceipt};
pub use exporter::{ExportError, Exporter};
pub use package::{BuiltPackage, ExportManifest, ManifestEntry, PackageBuilder, PackageError};
pub use poller::{poll_until_terminal, PollConfig, PollOutcome};
