//! Bounded status polling for submitted packages.
//!
//! The loop is capped at a configured attempt count with a growing,
//! clamped backoff between polls; running out of attempts surfaces a
//! distinct [`PollOutcome::TimedOut`] rather than blocking forever, and
//! is never conflated with a submit failure.

use tokio_util::sync::CancellationToken;

use folio_core::retry::{next_delay, BackoffConfig};

use crate::client::{IngestState, IngestionService};

/// Tunables for the status poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Hard cap on status requests per handshake.
    pub max_attempts: u32,
    /// Delay schedule between polls.
    pub backoff: BackoffConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: BackoffConfig {
                initial_delay: std::time::Duration::from_secs(2),
                max_delay: std::time::Duration::from_secs(60),
                multiplier: 2.0,
            },
        }
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The package is ready for processing.
    Ready { attempts: u32 },
    /// The service rejected the package (terminal validation failure).
    Rejected {
        attempts: u32,
        detail: Option<String>,
    },
    /// The attempt budget ran out without reaching a terminal state.
    TimedOut { attempts: u32 },
    /// The caller cancelled the loop.
    Cancelled { attempts: u32 },
}

/// Poll a handle until it reaches a terminal state, the attempt budget
/// runs out, or the token is cancelled.
///
/// Transient errors (network, 5xx, malformed bodies) consume an attempt
/// and the loop keeps going; an explicit 4xx rejection ends it
/// immediately.
pub async fn poll_until_terminal(
    service: &dyn IngestionService,
    handle: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> PollOutcome {
    let mut delay = config.backoff.initial_delay;

    for attempt in 1..=config.max_attempts {
        match service.status(handle).await {
            Ok(status) => match status.state {
                IngestState::Ready => return PollOutcome::Ready { attempts: attempt },
                IngestState::Failed => {
                    return PollOutcome::Rejected {
                        attempts: attempt,
                        detail: status.detail,
                    }
                }
                IngestState::Received | IngestState::Processing => {
                    tracing::debug!(handle, attempt, state = ?status.state, "Package not terminal yet");
                }
            },
            Err(e) if e.is_terminal() => {
                return PollOutcome::Rejected {
                    attempts: attempt,
                    detail: Some(e.to_string()),
                }
            }
            Err(e) => {
                tracing::warn!(handle, attempt, error = %e, "Transient status poll failure");
            }
        }

        if attempt < config.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled { attempts: attempt },
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay, &config.backoff);
        }
    }

    PollOutcome::TimedOut {
        attempts: config.max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::client::{IngestError, IngestStatus, SubmitReceipt};
    use crate::package::ExportManifest;

    /// Serves a scripted sequence of status responses.
    struct ScriptedService {
        responses: Mutex<VecDeque<Result<IngestStatus, IngestError>>>,
    }

    impl ScriptedService {
        fn new(
            responses: impl IntoIterator<Item = Result<IngestStatus, IngestError>>,
        ) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl IngestionService for ScriptedService {
        async fn submit(
            &self,
            _package_path: &Path,
            _manifest: &ExportManifest,
        ) -> Result<SubmitReceipt, IngestError> {
            unimplemented!("poller tests never submit")
        }

        async fn status(&self, _handle: &str) -> Result<IngestStatus, IngestError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("more status polls than scripted responses")
        }

        async fn trigger(&self, _handle: &str) -> Result<(), IngestError> {
            Ok(())
        }
    }

    fn status(state: IngestState) -> Result<IngestStatus, IngestError> {
        Ok(IngestStatus {
            state,
            detail: None,
        })
    }

    fn fast_config(max_attempts: u32) -> PollConfig {
        PollConfig {
            max_attempts,
            backoff: BackoffConfig {
                initial_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
                multiplier: 2.0,
            },
        }
    }

    #[tokio::test]
    async fn ten_non_terminal_polls_time_out() {
        let service =
            ScriptedService::new((0..10).map(|_| status(IngestState::Processing)));
        let outcome = poll_until_terminal(
            &service,
            "pkg-1",
            &fast_config(10),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 10 });
    }

    #[tokio::test]
    async fn ready_short_circuits_the_budget() {
        let service = ScriptedService::new([
            status(IngestState::Received),
            status(IngestState::Processing),
            status(IngestState::Ready),
        ]);
        let outcome = poll_until_terminal(
            &service,
            "pkg-1",
            &fast_config(10),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(outcome, PollOutcome::Ready { attempts: 3 });
    }

    #[tokio::test]
    async fn failed_state_is_rejected_with_detail() {
        let service = ScriptedService::new([Ok(IngestStatus {
            state: IngestState::Failed,
            detail: Some("checksum mismatch".to_string()),
        })]);
        let outcome = poll_until_terminal(
            &service,
            "pkg-1",
            &fast_config(10),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(
            outcome,
            PollOutcome::Rejected {
                attempts: 1,
                detail: Some("checksum mismatch".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn explicit_rejection_ends_polling_immediately() {
        let service = ScriptedService::new([Err(IngestError::Api {
            status: 422,
            body: "invalid manifest".to_string(),
        })]);
        let outcome = poll_until_terminal(
            &service,
            "pkg-1",
            &fast_config(10),
            &CancellationToken::new(),
        )
        .await;
        assert_matches::assert_matches!(outcome, PollOutcome::Rejected { attempts: 1, .. });
    }

    #[tokio::test]
    async fn transient_errors_consume_attempts_but_keep_polling() {
        let service = ScriptedService::new([
            Err(IngestError::Api {
                status: 503,
                body: "unavailable".to_string(),
            }),
            Err(IngestError::InvalidResponse("garbage".to_string())),
            status(IngestState::Ready),
        ]);
        let outcome = poll_until_terminal(
            &service,
            "pkg-1",
            &fast_config(10),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(outcome, PollOutcome::Ready { attempts: 3 });
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let service = ScriptedService::new([status(IngestState::Processing)]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let config = PollConfig {
            max_attempts: 10,
            backoff: BackoffConfig {
                initial_delay: Duration::from_secs(60),
                max_delay: Duration::from_secs(60),
                multiplier: 2.0,
            },
        };
        let outcome = poll_until_terminal(&service, "pkg-1", &config, &cancel).await;
        assert_eq!(outcome, PollOutcome::Cancelled { attempts: 1 });
    }
}
