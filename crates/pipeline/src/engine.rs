//! Chain execution engine.
//!
//! Runs the ordered steps of one file task, checkpointing every result in
//! the database. The engine is idempotent per step: it loads the
//! committed step results before doing anything, skips whatever is
//! already done, and commits new results with a conflict-tolerant append,
//! so at-least-once redelivery (worker crash, lease expiry, network
//! partition) can never produce duplicate work or divergent outputs. The
//! durable record is the only authority; no in-memory state is trusted
//! across a crash boundary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use folio_core::chain::{resolve_step_input, validate_steps, StepInput, StepSpec};
use folio_core::retry::{retry_delay, BackoffConfig, RetryClass, DEFAULT_MAX_RETRIES, DEFAULT_STEP_TIMEOUT_SECS};
use folio_core::status::JobState;
use folio_core::types::DbId;
use folio_db::models::file_task::TaskEnvelope;
use folio_db::models::step_result::NewStepResult;
use folio_db::repositories::{JobRepo, StepResultRepo, TaskRepo, TemplateRepo};
use folio_db::DbPool;
use folio_events::{EventBus, EventKind, PipelineEvent};
use folio_recog::{ProviderRegistry, RecognitionPayload};

use crate::queue::jittered;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for chain execution.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-invocation timeout for a provider call.
    pub step_timeout: Duration,
    /// How many transient step failures a task may accumulate before it
    /// fails for good. A budget of 3 means the third transient error is
    /// fatal.
    pub max_retries: u32,
    /// Backoff schedule for transient requeues.
    pub backoff: BackoffConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes and errors
// ---------------------------------------------------------------------------

/// How one engine run over an envelope ended.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// Every step committed; `output` is the final step's text.
    Succeeded { output: String },
    /// All steps were already committed by an earlier delivery; the task
    /// result is unchanged. The redelivered envelope resolves as a no-op.
    AlreadyComplete { output: String },
    /// A transient step failure with retry budget left: requeue without
    /// advancing.
    Requeue {
        step_index: usize,
        error: String,
        delay: Duration,
    },
    /// A permanent failure, or the retry budget is exhausted. Later steps
    /// are never attempted; committed results stay on record for audit.
    Failed {
        step_index: Option<i32>,
        error: String,
    },
    /// The job was cancelled; the task stops without advancing.
    Cancelled,
}

/// Infrastructure failures that prevent a run from reaching an outcome.
/// These leave the task leased; the lease reclaim redelivers it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Template {0} not found")]
    TemplateMissing(DbId),

    #[error("Template {id} has undecodable steps: {source}")]
    CorruptTemplate {
        id: DbId,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Executes recognition chains against the checkpoint store.
pub struct ChainEngine {
    pool: DbPool,
    registry: Arc<ProviderRegistry>,
    bus: Arc<EventBus>,
    config: EngineConfig,
}

impl ChainEngine {
    pub fn new(
        pool: DbPool,
        registry: Arc<ProviderRegistry>,
        bus: Arc<EventBus>,
        config: EngineConfig,
    ) -> Self {
        Self {
            pool,
            registry,
            bus,
            config,
        }
    }

    /// Execute the chain for one claimed envelope.
    ///
    /// Resumes from the first step without a committed result and runs to
    /// the end of the chain, a failure, or a cancellation. Does not
    /// resolve the task in the queue; pass the outcome to
    /// [`apply`](Self::apply) for that.
    pub async fn run(&self, envelope: &TaskEnvelope) -> Result<TaskOutcome, EngineError> {
        let template = TemplateRepo::find_by_id(&self.pool, envelope.template_id)
            .await?
            .ok_or(EngineError::TemplateMissing(envelope.template_id))?;
        let steps: Vec<StepSpec> =
            template
                .parsed_steps()
                .map_err(|source| EngineError::CorruptTemplate {
                    id: template.id,
                    source,
                })?;

        // Execution is the third validation call site (after template
        // create and update); a template that slipped through is a
        // permanent task failure, never a panic.
        if let Err(e) = validate_steps(&steps) {
            tracing::error!(
                task_id = envelope.task_id,
                template_id = template.id,
                error = %e,
                "Refusing to execute invalid chain"
            );
            return Ok(TaskOutcome::Failed {
                step_index: None,
                error: format!("Invalid chain template: {e}"),
            });
        }

        // Load the durable checkpoints; this is the resume point after a
        // crash or redelivery.
        let committed = StepResultRepo::list_committed(&self.pool, envelope.task_id).await?;
        let mut outputs: Vec<Option<String>> = vec![None; steps.len()];
        for result in &committed {
            let index = result.step_index as usize;
            if index < steps.len() {
                outputs[index] = result.output_text.clone();
            }
        }

        let start = outputs.iter().position(|o| o.is_none()).unwrap_or(steps.len());
        if start == steps.len() {
            // A previous delivery already finished the chain.
            tracing::debug!(
                task_id = envelope.task_id,
                "All steps already committed, resolving as no-op"
            );
            let output = outputs.last().cloned().flatten().unwrap_or_default();
            return Ok(TaskOutcome::AlreadyComplete { output });
        }

        self.bus.publish(
            PipelineEvent::new(EventKind::TaskStarted)
                .with_job(envelope.job_id)
                .with_task(envelope.task_id)
                .with_step(start as i32),
        );

        for index in start..steps.len() {
            // Cancellation is honoured between steps; an in-flight
            // provider call is bounded by its own timeout.
            if JobRepo::cancel_requested(&self.pool, envelope.job_id).await? {
                tracing::info!(
                    task_id = envelope.task_id,
                    job_id = envelope.job_id,
                    "Job cancelled, stopping chain"
                );
                return Ok(TaskOutcome::Cancelled);
            }

            match self.run_step(envelope, &steps, index, &mut outputs).await? {
                StepOutcome::Advanced => {}
                StepOutcome::Stop(outcome) => return Ok(outcome),
            }
        }

        let output = outputs.last().cloned().flatten().unwrap_or_default();
        Ok(TaskOutcome::Succeeded { output })
    }

    /// Execute one step: resolve input, invoke the provider under the
    /// step timeout, and commit the result.
    async fn run_step(
        &self,
        envelope: &TaskEnvelope,
        steps: &[StepSpec],
        index: usize,
        outputs: &mut [Option<String>],
    ) -> Result<StepOutcome, EngineError> {
        let step = &steps[index];

        let Some(provider) = self.registry.get(&step.provider) else {
            return Ok(StepOutcome::Stop(TaskOutcome::Failed {
                step_index: Some(index as i32),
                error: format!("Unknown recognition provider '{}'", step.provider),
            }));
        };

        let input = match resolve_step_input(index, &step.input, outputs) {
            Ok(input) => input,
            Err(e) => {
                // Unreachable for a validated chain executing in order;
                // if it fires anyway it is a bug, and it must be loud.
                tracing::error!(
                    task_id = envelope.task_id,
                    step_index = index,
                    error = %e,
                    "Internal invariant violated while resolving step input"
                );
                return Ok(StepOutcome::Stop(TaskOutcome::Failed {
                    step_index: Some(index as i32),
                    error: e.to_string(),
                }));
            }
        };

        let payload = match input {
            StepInput::Original => {
                RecognitionPayload::Document(PathBuf::from(&envelope.file_path))
            }
            StepInput::Text(text) => RecognitionPayload::Text(text),
        };

        let started_at = Utc::now();
        let invocation = tokio::time::timeout(
            self.config.step_timeout,
            provider.recognize(&payload, &step.config),
        )
        .await;
        let finished_at = Utc::now();

        let (output_text, confidence, error, retry_class) = match &invocation {
            Ok(Ok(recognition)) => (
                Some(recognition.text.clone()),
                recognition.confidence,
                None,
                None,
            ),
            Ok(Err(e)) => (None, None, Some(e.to_string()), Some(e.retry_class())),
            Err(_) => (
                None,
                None,
                Some(format!(
                    "Provider '{}' timed out after {}s",
                    step.provider,
                    self.config.step_timeout.as_secs()
                )),
                // A hung provider is indistinguishable from a slow one.
                Some(RetryClass::Transient),
            ),
        };

        let appended = StepResultRepo::append(
            &self.pool,
            &NewStepResult {
                file_task_id: envelope.task_id,
                step_index: index as i32,
                provider: step.provider.clone(),
                output_text,
                confidence,
                error: error.clone(),
                started_at,
                finished_at,
            },
        )
        .await?;

        if let Some(error) = error {
            let class = retry_class.unwrap_or(RetryClass::Permanent);
            return Ok(StepOutcome::Stop(self.failure_outcome(envelope, index, error, class)));
        }

        // Success. If the insert conflicted, another worker committed
        // this step first. Adopt its result so both deliveries converge
        // on identical outputs.
        let committed_text = match appended {
            Some(row) => row.output_text.unwrap_or_default(),
            None => {
                StepResultRepo::find_committed(&self.pool, envelope.task_id, index as i32)
                    .await?
                    .and_then(|row| row.output_text)
                    .unwrap_or_default()
            }
        };

        self.bus.publish(
            PipelineEvent::new(EventKind::StepCompleted)
                .with_job(envelope.job_id)
                .with_task(envelope.task_id)
                .with_step(index as i32)
                .with_payload(serde_json::json!({
                    "provider": step.provider,
                    "confidence": confidence,
                })),
        );

        outputs[index] = Some(committed_text);
        Ok(StepOutcome::Advanced)
    }

    /// Turn a step failure into a task outcome, consuming retry budget
    /// for transient failures.
    ///
    /// `retry_count` holds the number of prior transient requeues, so
    /// this failure is number `retry_count + 1`; once that reaches the
    /// budget the task fails with this error attached.
    fn failure_outcome(
        &self,
        envelope: &TaskEnvelope,
        step_index: usize,
        error: String,
        class: RetryClass,
    ) -> TaskOutcome {
        let attempt = envelope.retry_count.max(0) as u32;
        if class == RetryClass::Transient && attempt + 1 < self.config.max_retries {
            let delay = retry_delay(attempt, &self.config.backoff);
            TaskOutcome::Requeue {
                step_index,
                error,
                delay,
            }
        } else {
            TaskOutcome::Failed {
                step_index: Some(step_index as i32),
                error,
            }
        }
    }

    /// Resolve the envelope in the queue according to the outcome, then
    /// recompute the job state and announce terminal transitions.
    pub async fn apply(
        &self,
        envelope: &TaskEnvelope,
        outcome: &TaskOutcome,
    ) -> Result<(), EngineError> {
        match outcome {
            TaskOutcome::Succeeded { output } => {
                TaskRepo::mark_succeeded(&self.pool, envelope.task_id, output).await?;
                self.bus.publish(
                    PipelineEvent::new(EventKind::TaskSucceeded)
                        .with_job(envelope.job_id)
                        .with_task(envelope.task_id),
                );
            }
            TaskOutcome::AlreadyComplete { output } => {
                // Idempotent re-acknowledgement of the same result.
                TaskRepo::mark_succeeded(&self.pool, envelope.task_id, output).await?;
            }
            TaskOutcome::Requeue {
                step_index,
                error,
                delay,
            } => {
                TaskRepo::requeue(
                    &self.pool,
                    envelope.task_id,
                    error,
                    jittered(*delay).as_secs_f64(),
                )
                .await?;
                self.bus.publish(
                    PipelineEvent::new(EventKind::TaskRequeued)
                        .with_job(envelope.job_id)
                        .with_task(envelope.task_id)
                        .with_step(*step_index as i32)
                        .with_payload(serde_json::json!({
                            "error": error,
                            "retry_count": envelope.retry_count + 1,
                        })),
                );
            }
            TaskOutcome::Failed { step_index, error } => {
                TaskRepo::mark_failed(&self.pool, envelope.task_id, *step_index, error).await?;
                self.bus.publish(
                    PipelineEvent::new(EventKind::TaskFailed)
                        .with_job(envelope.job_id)
                        .with_task(envelope.task_id)
                        .with_payload(serde_json::json!({
                            "error": error,
                            "step_index": step_index,
                        })),
                );
            }
            TaskOutcome::Cancelled => {
                TaskRepo::mark_cancelled(&self.pool, envelope.task_id).await?;
                self.bus.publish(
                    PipelineEvent::new(EventKind::TaskCancelled)
                        .with_job(envelope.job_id)
                        .with_task(envelope.task_id),
                );
            }
        }

        let state_id = JobRepo::refresh_state(&self.pool, envelope.job_id).await?;
        let terminal = [
            JobState::Completed.id(),
            JobState::CompletedWithErrors.id(),
            JobState::Failed.id(),
            JobState::Cancelled.id(),
        ]
        .contains(&state_id);
        if terminal {
            self.bus.publish(
                PipelineEvent::new(EventKind::JobFinished)
                    .with_job(envelope.job_id)
                    .with_payload(serde_json::json!({ "state_id": state_id })),
            );
        }

        Ok(())
    }

    /// Convenience wrapper: run the chain and resolve the envelope.
    pub async fn process(&self, envelope: &TaskEnvelope) -> Result<TaskOutcome, EngineError> {
        let outcome = self.run(envelope).await?;
        self.apply(envelope, &outcome).await?;
        Ok(outcome)
    }
}

/// Control flow of one step execution.
enum StepOutcome {
    Advanced,
    Stop(TaskOutcome),
}
