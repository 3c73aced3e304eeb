//! Worker fleet constants and validation.
//!
//! Pure functions and constants used by both the API and the worker
//! binary. Lives in `core` to maintain the zero internal dependency
//! constraint.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// If a worker has not sent a heartbeat within this many seconds,
/// it is considered offline and should be marked accordingly.
pub const HEARTBEAT_TIMEOUT_SECS: u64 = 120;

/// How often the heartbeat monitor loop should check for stale workers
/// and expired task leases.
pub const HEARTBEAT_CHECK_INTERVAL_SECS: u64 = 30;

/// Maximum length of a worker name.
const MAX_NAME_LEN: usize = 128;

/// Maximum number of file tasks a single worker may run concurrently.
pub const MAX_WORKER_CONCURRENCY: u32 = 32;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a worker name.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_NAME_LEN` characters.
/// - Must contain only alphanumeric, hyphen, underscore, or dot characters.
pub fn validate_worker_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Worker name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Worker name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(
            "Worker name may only contain alphanumeric, hyphen, underscore, or dot characters"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate a worker's configured concurrency limit.
pub fn validate_concurrency(concurrency: u32) -> Result<(), CoreError> {
    if concurrency == 0 {
        return Err(CoreError::Validation(
            "Worker concurrency must be at least 1".to_string(),
        ));
    }
    if concurrency > MAX_WORKER_CONCURRENCY {
        return Err(CoreError::Validation(format!(
            "Worker concurrency must not exceed {MAX_WORKER_CONCURRENCY}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_worker_name() {
        assert!(validate_worker_name("scan-worker-01.prod").is_ok());
    }

    #[test]
    fn empty_worker_name_rejected() {
        assert!(validate_worker_name("").is_err());
    }

    #[test]
    fn worker_name_with_spaces_rejected() {
        assert!(validate_worker_name("worker 01").is_err());
    }

    #[test]
    fn worker_name_too_long_rejected() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        assert!(validate_worker_name(&name).is_err());
    }

    #[test]
    fn zero_concurrency_rejected() {
        assert!(validate_concurrency(0).is_err());
    }

    #[test]
    fn excessive_concurrency_rejected() {
        assert!(validate_concurrency(MAX_WORKER_CONCURRENCY + 1).is_err());
    }

    #[test]
    fn sane_concurrency_accepted() {
        assert!(validate_concurrency(1).is_ok());
        assert!(validate_concurrency(4).is_ok());
        assert!(validate_concurrency(MAX_WORKER_CONCURRENCY).is_ok());
    }
}
