//! Recognition chain model: step specifications, template validation, and
//! step-input resolution.
//!
//! A chain is an ordered list of [`StepSpec`]s. Validation lives here and
//! nowhere else: template creation, template update, and the execution
//! engine all call [`validate_steps`] so the three call sites can never
//! diverge. Input resolution ([`resolve_step_input`]) is equally pure: the
//! engine hands it the committed step outputs and gets back what to feed
//! the next provider.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Separator used when a step consumes the combined output of all prior
/// steps. Fixed so that combined inputs are reproducible across runs and
/// asserted in tests.
pub const COMBINED_SEPARATOR: &str = "\n\n";

/// Upper bound on the number of steps in a single chain.
pub const MAX_CHAIN_STEPS: usize = 32;

// ---------------------------------------------------------------------------
// Step model
// ---------------------------------------------------------------------------

/// Where a step's input comes from.
///
/// A closed set so that dispatch is exhaustiveness-checked at compile time
/// rather than matched on free-form strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputSource {
    /// The raw input file itself.
    Original,
    /// The output text of the immediately preceding step.
    PreviousStep,
    /// The output text of an earlier step by index (must be `<` the
    /// current step's index).
    SpecificStep { step: usize },
    /// The outputs of all prior steps, concatenated in step order with
    /// [`COMBINED_SEPARATOR`].
    Combined,
}

impl Default for InputSource {
    fn default() -> Self {
        Self::Original
    }
}

/// One stage of a recognition chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    /// Identifier of the recognition backend to invoke.
    pub provider: String,
    /// Where this step's input comes from.
    #[serde(default)]
    pub input: InputSource,
    /// Provider-specific configuration. Passed through to the provider
    /// untouched; the engine never interprets it.
    #[serde(default)]
    pub config: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A reason a chain definition is invalid. Every variant names the step
/// index it was detected at so callers can point at the offending step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainValidationError {
    #[error("Chain must contain at least one step")]
    EmptyChain,

    #[error("Step 0 must read from the original input")]
    InvalidFirstStepSource,

    #[error("Step {step} references step {referenced}, which does not precede it")]
    DanglingStepReference { step: usize, referenced: usize },

    #[error("Step {step} is missing a provider identifier")]
    MissingProvider { step: usize },

    #[error("Chain has {got} steps, the maximum is {MAX_CHAIN_STEPS}")]
    TooManySteps { got: usize },
}

/// Validate a chain's step list.
///
/// Rules, evaluated in step order:
/// 1. the list is non-empty,
/// 2. step 0 reads from [`InputSource::Original`],
/// 3. every `SpecificStep { step: n }` satisfies `n < current_index`,
/// 4. every provider identifier is non-blank.
///
/// Deterministic: the same step list always yields the same result, and
/// the first violation in step order wins.
pub fn validate_steps(steps: &[StepSpec]) -> Result<(), ChainValidationError> {
    if steps.is_empty() {
        return Err(ChainValidationError::EmptyChain);
    }
    if steps.len() > MAX_CHAIN_STEPS {
        return Err(ChainValidationError::TooManySteps { got: steps.len() });
    }

    for (index, step) in steps.iter().enumerate() {
        if index == 0 && step.input != InputSource::Original {
            return Err(ChainValidationError::InvalidFirstStepSource);
        }

        if let InputSource::SpecificStep { step: referenced } = step.input {
            if referenced >= index {
                return Err(ChainValidationError::DanglingStepReference {
                    step: index,
                    referenced,
                });
            }
        }

        if step.provider.trim().is_empty() {
            return Err(ChainValidationError::MissingProvider { step: index });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Input resolution
// ---------------------------------------------------------------------------

/// The resolved input for one step invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    /// Feed the provider the raw input file.
    Original,
    /// Feed the provider the given text.
    Text(String),
}

/// An input could not be resolved because a required prior step result is
/// not present. Given a validated chain and in-order execution this is
/// unreachable; it is checked defensively and treated as a fatal internal
/// error, never silently swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Step {step} requires the output of step {missing}, which has no committed result")]
pub struct MissingPriorStep {
    pub step: usize,
    pub missing: usize,
}

/// Resolve the input for the step at `step_index`.
///
/// `outputs[i]` must hold the committed output text of step `i` if that
/// step has a successful result, `None` otherwise. Only indices
/// `< step_index` are consulted.
pub fn resolve_step_input(
    step_index: usize,
    source: &InputSource,
    outputs: &[Option<String>],
) -> Result<StepInput, MissingPriorStep> {
    let prior = |missing: usize| -> Result<String, MissingPriorStep> {
        outputs
            .get(missing)
            .and_then(|o| o.clone())
            .ok_or(MissingPriorStep {
                step: step_index,
                missing,
            })
    };

    match source {
        InputSource::Original => Ok(StepInput::Original),
        InputSource::PreviousStep => {
            if step_index == 0 {
                return Err(MissingPriorStep {
                    step: 0,
                    missing: 0,
                });
            }
            Ok(StepInput::Text(prior(step_index - 1)?))
        }
        InputSource::SpecificStep { step } => Ok(StepInput::Text(prior(*step)?)),
        InputSource::Combined => {
            let mut parts = Vec::with_capacity(step_index);
            for missing in 0..step_index {
                parts.push(prior(missing)?);
            }
            Ok(StepInput::Text(parts.join(COMBINED_SEPARATOR)))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
