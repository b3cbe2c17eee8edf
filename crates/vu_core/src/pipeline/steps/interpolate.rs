//! Interpolate stage - resample the enhanced sequence to the target rate.
//!
//! One encoder invocation reads the enhanced frames as an image sequence
//! at the source rate and resamples to the target with motion-compensated
//! interpolation. The filter parameters are policy, not per-run tunables.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::frames;
use crate::media::FrameRate;
use crate::pipeline::errors::{InterpolationError, PipelineError, PipelineResult, Stage};
use crate::pipeline::step::PipelineStep;
use crate::pipeline::types::{Context, InterpolateOutput, RunState, StepOutcome};
use crate::tools;

// Motion-compensation policy: bidirectional motion estimation, overlapped
// block compensation, variable-size block refinement.
const MI_MODE: &str = "mci";
const MC_MODE: &str = "aobmc";
const ME_MODE: &str = "bidir";
const VSBMC: u32 = 1;

// Encode target for the silent intermediate.
const ENCODE_CODEC: &str = "libx264";
const ENCODE_PRESET: &str = "slow";
const ENCODE_CRF: &str = "18";
const PIX_FMT: &str = "yuv420p";

pub struct InterpolateStep;

impl InterpolateStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InterpolateStep {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn filter_arg(target: &FrameRate) -> String {
    format!(
        "minterpolate=fps={}:mi_mode={MI_MODE}:mc_mode={MC_MODE}:me_mode={ME_MODE}:vsbmc={VSBMC}",
        target.to_arg()
    )
}

pub(crate) fn interpolate_args(
    frames_dir: &Path,
    source_rate: &FrameRate,
    target_rate: &FrameRate,
    output: &Path,
) -> Vec<OsString> {
    let pattern = frames_dir.join(frames::sequence_pattern());
    vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        // The rational source rate passes through verbatim; no float
        // rounding accumulates over the sequence.
        "-framerate".into(),
        source_rate.to_arg().into(),
        "-i".into(),
        pattern.as_os_str().to_os_string(),
        "-vf".into(),
        filter_arg(target_rate).into(),
        "-c:v".into(),
        ENCODE_CODEC.into(),
        "-preset".into(),
        ENCODE_PRESET.into(),
        "-crf".into(),
        ENCODE_CRF.into(),
        "-pix_fmt".into(),
        PIX_FMT.into(),
        "-an".into(),
        output.as_os_str().to_os_string(),
    ]
}

impl PipelineStep for InterpolateStep {
    fn name(&self) -> &str {
        "Interpolate"
    }

    fn stage(&self) -> Stage {
        Stage::Interpolate
    }

    fn description(&self) -> &str {
        "Resample the enhanced sequence to the target rate"
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> PipelineResult<()> {
        if ctx.is_still_image() {
            return Ok(());
        }
        if !state.has_enhancement() {
            return Err(PipelineError::Precondition {
                stage: Stage::Interpolate,
                message: "no enhanced frame sequence to interpolate".to_string(),
            });
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<StepOutcome> {
        if ctx.is_still_image() {
            return Ok(StepOutcome::Skipped(
                "still-image input, nothing to interpolate".to_string(),
            ));
        }

        let source_rate = ctx.source_rate;
        let target_rate = ctx.target_rate();
        if target_rate <= source_rate {
            // Degrades to a plain re-encode; valid, but adds no frames.
            ctx.logger.warn(&format!(
                "target rate {} does not exceed source rate {}; no new frames will be synthesized",
                target_rate, source_rate
            ));
        }

        let frames_dir = ctx.workspace.enhanced_frames_dir();
        let silent = ctx.workspace.silent_video_path();

        ctx.logger.info(&format!(
            "interpolating {:.3} -> {:.3} fps",
            source_rate.as_f64(),
            target_rate.as_f64()
        ));

        let ffmpeg = &ctx.settings.tools.ffmpeg;
        let mut cmd = Command::new(ffmpeg);
        cmd.args(interpolate_args(
            &frames_dir,
            &source_rate,
            &target_rate,
            &silent,
        ));
        let command = format!(
            "{} {}",
            ffmpeg,
            cmd.get_args()
                .map(|a| a.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
        tools::run_logged(&ctx.logger, ffmpeg, &mut cmd).map_err(InterpolationError::from)?;

        if !silent.exists() {
            return Err(InterpolationError::NoOutput(silent).into());
        }

        state.interpolate = Some(InterpolateOutput {
            silent_video: silent,
            source_rate,
            target_rate,
            command,
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> PipelineResult<()> {
        let output = state
            .interpolate
            .as_ref()
            .ok_or_else(|| PipelineError::InvalidOutput {
                stage: Stage::Interpolate,
                message: "interpolation results not recorded".to_string(),
            })?;

        if !output.silent_video.exists() {
            return Err(PipelineError::InvalidOutput {
                stage: Stage::Interpolate,
                message: format!("silent video missing: {}", output.silent_video.display()),
            });
        }

        Ok(())
    }
}
