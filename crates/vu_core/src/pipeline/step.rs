//! Pipeline step trait definition.

use super::errors::{PipelineResult, Stage};
use super::types::{Context, RunState, StepOutcome};

/// Trait for pipeline steps.
///
/// The runner calls these in order for each step:
///
/// 1. `validate_input` - check preconditions before execution
/// 2. `execute` - perform the step's work
/// 3. `validate_output` - verify the step produced valid output
///
/// A step reads only its declared input location and writes only its
/// declared output location; the `RunState` manifest is the sole other
/// channel between stages.
pub trait PipelineStep: Send + Sync {
    /// Step name, for logging and progress.
    fn name(&self) -> &str;

    /// Stage identity, for error attribution.
    fn stage(&self) -> Stage;

    /// Validate inputs before execution.
    fn validate_input(&self, ctx: &Context, state: &RunState) -> PipelineResult<()>;

    /// Execute the step's main work.
    ///
    /// Returns `StepOutcome::Skipped` when the step determined it does not
    /// apply to this run (still-image inputs skip the temporal stages).
    fn execute(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<StepOutcome>;

    /// Validate outputs after a successful execution.
    fn validate_output(&self, ctx: &Context, state: &RunState) -> PipelineResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
