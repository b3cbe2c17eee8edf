//! Extract stage - split the source into the raw frame sequence.
//!
//! One decoder invocation writes the whole sequence, near-lossless
//! (`-qscale:v 2`), indexed from 0. The directory is then re-scanned; that
//! sorted listing, not the decoder's own ordering, is what every later
//! stage consumes.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::frames::{self, FrameSequence};
use crate::pipeline::errors::{ExtractionError, PipelineError, PipelineResult, Stage};
use crate::pipeline::step::PipelineStep;
use crate::pipeline::types::{Context, ExtractOutput, RunState, StepOutcome};
use crate::tools;

/// Quality parameter for still-image output; 2 is near-lossless.
const EXTRACT_QSCALE: &str = "2";

pub struct ExtractStep;

impl ExtractStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractStep {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn extract_args(source: &Path, pattern: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-i".into(),
        source.as_os_str().to_os_string(),
        "-qscale:v".into(),
        EXTRACT_QSCALE.into(),
        "-start_number".into(),
        "0".into(),
        pattern.as_os_str().to_os_string(),
    ]
}

impl PipelineStep for ExtractStep {
    fn name(&self) -> &str {
        "Extract"
    }

    fn stage(&self) -> Stage {
        Stage::Extract
    }

    fn description(&self) -> &str {
        "Split the source into an ordered frame sequence"
    }

    fn validate_input(&self, ctx: &Context, _state: &RunState) -> PipelineResult<()> {
        if !ctx.source().exists() {
            return Err(PipelineError::Precondition {
                stage: Stage::Extract,
                message: format!("source not found: {}", ctx.source().display()),
            });
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<StepOutcome> {
        let raw_dir = ctx.workspace.raw_frames_dir();
        let pattern = raw_dir.join(frames::sequence_pattern());

        ctx.logger.info(&format!(
            "extracting frames from {}",
            ctx.source().display()
        ));

        let ffmpeg = &ctx.settings.tools.ffmpeg;
        let mut cmd = Command::new(ffmpeg);
        cmd.args(extract_args(ctx.source(), &pattern));
        tools::run_logged(&ctx.logger, ffmpeg, &mut cmd).map_err(ExtractionError::from)?;

        // The re-scan is authoritative: sorted by numeric index, gap-free.
        let sequence = FrameSequence::scan(&raw_dir).map_err(ExtractionError::from)?;
        if sequence.is_empty() {
            return Err(ExtractionError::NoFrames(raw_dir).into());
        }

        ctx.logger.info(&format!(
            "extracted {} frames at {:.3} fps",
            sequence.len(),
            ctx.source_rate.as_f64()
        ));
        ctx.report_progress(self.name(), sequence.len() as u64, sequence.len() as u64);

        state.extract = Some(ExtractOutput {
            frame_count: sequence.len(),
            frames_dir: raw_dir,
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> PipelineResult<()> {
        match &state.extract {
            Some(output) if output.frame_count >= 1 => Ok(()),
            Some(_) => Err(PipelineError::InvalidOutput {
                stage: Stage::Extract,
                message: "empty frame sequence recorded".to_string(),
            }),
            None => Err(PipelineError::InvalidOutput {
                stage: Stage::Extract,
                message: "extraction results not recorded".to_string(),
            }),
        }
    }
}
