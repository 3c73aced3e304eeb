//! Job-level aggregation over file-task states.
//!
//! A job's state is a pure function of its task counts. There is no
//! independently mutable "job finished" flag anywhere, so the status a
//! caller polls can never drift from the checkpoint store. The SQL in
//! `JobRepo::refresh_state` mirrors [`aggregate_job_state`] and the two
//! are asserted against each other in the repository tests.

use serde::Serialize;

use crate::status::JobState;

/// Per-state task counts for one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub queued: i64,
    pub running: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub cancelled: i64,
}

impl TaskCounts {
    /// Total number of file tasks the counts cover.
    pub fn total(&self) -> i64 {
        self.queued + self.running + self.succeeded + self.failed + self.cancelled
    }

    /// Whether every task has reached a terminal state.
    pub fn all_terminal(&self) -> bool {
        self.queued == 0 && self.running == 0
    }
}

/// Derive the job state from its task counts.
///
/// - no tasks yet: the job is still `Pending` (scan/enqueue in flight),
/// - any task queued or running: `Running`,
/// - otherwise terminal: successes plus any failure or cancellation is
///   `CompletedWithErrors`; only successes is `Completed`; failures and no
///   successes is `Failed`; only cancellations is `Cancelled`.
pub fn aggregate_job_state(counts: &TaskCounts) -> JobState {
    if counts.total() == 0 {
        return JobState::Pending;
    }
    if !counts.all_terminal() {
        return JobState::Running;
    }
    if counts.succeeded > 0 {
        if counts.failed > 0 || counts.cancelled > 0 {
            JobState::CompletedWithErrors
        } else {
            JobState::Completed
        }
    } else if counts.failed > 0 {
        JobState::Failed
    } else {
        JobState::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(queued: i64, running: i64, succeeded: i64, failed: i64, cancelled: i64) -> TaskCounts {
        TaskCounts {
            queued,
            running,
            succeeded,
            failed,
            cancelled,
        }
    }

    #[test]
    fn no_tasks_is_pending() {
        assert_eq!(aggregate_job_state(&TaskCounts::default()), JobState::Pending);
    }

    #[test]
    fn any_queued_or_running_is_running() {
        assert_eq!(aggregate_job_state(&counts(1, 0, 0, 0, 0)), JobState::Running);
        assert_eq!(aggregate_job_state(&counts(0, 1, 49, 0, 0)), JobState::Running);
        assert_eq!(aggregate_job_state(&counts(2, 3, 10, 5, 0)), JobState::Running);
    }

    #[test]
    fn all_succeeded_is_completed() {
        assert_eq!(aggregate_job_state(&counts(0, 0, 50, 0, 0)), JobState::Completed);
    }

    #[test]
    fn mixed_outcome_is_completed_with_errors() {
        assert_eq!(
            aggregate_job_state(&counts(0, 0, 49, 1, 0)),
            JobState::CompletedWithErrors
        );
        assert_eq!(
            aggregate_job_state(&counts(0, 0, 1, 0, 3)),
            JobState::CompletedWithErrors
        );
    }

    #[test]
    fn all_failed_is_failed() {
        assert_eq!(aggregate_job_state(&counts(0, 0, 0, 4, 0)), JobState::Failed);
    }

    #[test]
    fn failures_without_successes_win_over_cancellations() {
        assert_eq!(aggregate_job_state(&counts(0, 0, 0, 2, 5)), JobState::Failed);
    }

    #[test]
    fn only_cancellations_is_cancelled() {
        assert_eq!(aggregate_job_state(&counts(0, 0, 0, 0, 7)), JobState::Cancelled);
    }

    #[test]
    fn counts_sum_to_total() {
        let c = counts(3, 2, 30, 10, 5);
        assert_eq!(c.total(), 50);
    }
}
