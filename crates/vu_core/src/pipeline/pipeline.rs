//! Pipeline runner that executes stages in sequence.

use super::errors::{PipelineError, PipelineResult};
use super::step::PipelineStep;
use super::types::{Context, RunState, StepOutcome};

/// Pipeline that runs a sequence of steps.
///
/// Steps execute strictly in order with a barrier between them: a stage
/// fully finishes (and its output is validated) before the next one reads
/// anything. The first failure aborts the remaining stages.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Run the pipeline with the given context and state.
    ///
    /// Returns which steps completed and which skipped themselves, or the
    /// first stage error.
    pub fn run(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult::default();

        for step in &self.steps {
            if ctx.is_cancelled() {
                ctx.logger
                    .warn(&format!("run cancelled before stage '{}'", step.name()));
                return Err(PipelineError::Cancelled {
                    stage: step.stage(),
                });
            }

            ctx.logger.phase(step.name());

            if let Err(e) = step.validate_input(ctx, state) {
                ctx.logger.error(&format!("input validation failed: {}", e));
                return Err(e);
            }

            let outcome = match step.execute(ctx, state) {
                Ok(outcome) => outcome,
                Err(e) => {
                    ctx.logger.error(&format!("{} failed: {}", step.name(), e));
                    ctx.logger.show_tail("run transcript");
                    return Err(e);
                }
            };

            match outcome {
                StepOutcome::Success => {
                    if let Err(e) = step.validate_output(ctx, state) {
                        ctx.logger
                            .error(&format!("output validation failed: {}", e));
                        return Err(e);
                    }
                    ctx.logger.success(&format!("{} completed", step.name()));
                    result.steps_completed.push(step.name().to_string());
                }
                StepOutcome::Skipped(reason) => {
                    ctx.logger
                        .info(&format!("{} skipped: {}", step.name(), reason));
                    result.steps_skipped.push(step.name().to_string());
                }
            }
        }

        ctx.logger.success("pipeline completed");
        Ok(result)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    /// Steps that completed successfully.
    pub steps_completed: Vec<String>,
    /// Steps that skipped themselves.
    pub steps_skipped: Vec<String>,
}
