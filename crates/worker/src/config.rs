//! Worker configuration loaded from environment variables.

use std::time::Duration;

use folio_core::retry::{DEFAULT_LEASE_SECS, DEFAULT_MAX_RETRIES, DEFAULT_STEP_TIMEOUT_SECS};
use folio_core::worker_pool::{validate_concurrency, validate_worker_name};

/// Worker process configuration.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Unique worker name; restarting under the same name reclaims the
    /// registry row.
    pub name: String,
    /// How many file tasks this worker runs concurrently.
    pub concurrency: u32,
    /// How long to sleep between claim attempts when the queue is empty.
    pub poll_interval: Duration,
    /// Claim lease duration; leases that outlive this are redelivered.
    pub lease: Duration,
    /// Per-invocation provider timeout.
    pub step_timeout: Duration,
    /// Transient-failure budget per task; the failure that reaches this
    /// count is fatal.
    pub max_retries: u32,
    /// Provider registry spec, `id=url,id2=url2`.
    pub providers_spec: String,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default          |
    /// |--------------------------|------------------|
    /// | `WORKER_NAME`            | `folio-worker-1` |
    /// | `WORKER_CONCURRENCY`     | `4`              |
    /// | `QUEUE_POLL_INTERVAL_MS` | `1000`           |
    /// | `TASK_LEASE_SECS`        | `300`            |
    /// | `STEP_TIMEOUT_SECS`      | `120`            |
    /// | `TASK_MAX_RETRIES`       | `3`              |
    /// | `RECOGNITION_PROVIDERS`  | (empty)          |
    pub fn from_env() -> Self {
        let name =
            std::env::var("WORKER_NAME").unwrap_or_else(|_| "folio-worker-1".into());
        validate_worker_name(&name).expect("WORKER_NAME is invalid");

        let concurrency: u32 = std::env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WORKER_CONCURRENCY must be a valid u32");
        validate_concurrency(concurrency).expect("WORKER_CONCURRENCY is out of range");

        let poll_interval_ms: u64 = std::env::var("QUEUE_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("QUEUE_POLL_INTERVAL_MS must be a valid u64");

        let lease_secs: u64 = std::env::var("TASK_LEASE_SECS")
            .unwrap_or_else(|_| DEFAULT_LEASE_SECS.to_string())
            .parse()
            .expect("TASK_LEASE_SECS must be a valid u64");

        let step_timeout_secs: u64 = std::env::var("STEP_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_STEP_TIMEOUT_SECS.to_string())
            .parse()
            .expect("STEP_TIMEOUT_SECS must be a valid u64");

        let max_retries: u32 = std::env::var("TASK_MAX_RETRIES")
            .unwrap_or_else(|_| DEFAULT_MAX_RETRIES.to_string())
            .parse()
            .expect("TASK_MAX_RETRIES must be a valid u32");

        let providers_spec = std::env::var("RECOGNITION_PROVIDERS").unwrap_or_default();

        Self {
            name,
            concurrency,
            poll_interval: Duration::from_millis(poll_interval_ms),
            lease: Duration::from_secs(lease_secs),
            step_timeout: Duration::from_secs(step_timeout_secs),
            max_retries,
            providers_spec,
        }
    }
}
