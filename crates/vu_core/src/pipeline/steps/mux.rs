//! Mux stage - re-attach the original audio to the silent video.
//!
//! The interpolated video stream is copied, never re-encoded. When the
//! source has no audio the silent video passes through byte-identical;
//! otherwise the original audio is re-encoded to a broadly compatible
//! codec, trimmed to the shorter stream since interpolation may shift the
//! total duration slightly.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::Command;

use crate::media;
use crate::pipeline::errors::{MuxError, PipelineError, PipelineResult, Stage};
use crate::pipeline::step::PipelineStep;
use crate::pipeline::types::{Context, MuxOutput, RunState, StepOutcome};
use crate::tools;

const AUDIO_CODEC: &str = "aac";

pub struct MuxStep;

impl MuxStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MuxStep {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn mux_args(silent: &Path, original: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-i".into(),
        silent.as_os_str().to_os_string(),
        "-i".into(),
        original.as_os_str().to_os_string(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        AUDIO_CODEC.into(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0?".into(),
        "-shortest".into(),
        output.as_os_str().to_os_string(),
    ]
}

/// Pass-through for audio-less sources: a plain byte copy, no re-encode.
pub(crate) fn passthrough_copy(silent: &Path, output: &Path) -> Result<(), MuxError> {
    fs::copy(silent, output).map_err(|e| MuxError::Copy {
        path: output.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

impl PipelineStep for MuxStep {
    fn name(&self) -> &str {
        "Mux"
    }

    fn stage(&self) -> Stage {
        Stage::Mux
    }

    fn description(&self) -> &str {
        "Re-attach the original audio track"
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> PipelineResult<()> {
        if ctx.is_still_image() {
            return Ok(());
        }
        if state.interpolate.is_none() {
            return Err(PipelineError::Precondition {
                stage: Stage::Mux,
                message: "no interpolated video to mux".to_string(),
            });
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<StepOutcome> {
        if ctx.is_still_image() {
            return Ok(StepOutcome::Skipped(
                "still-image input, no audio to attach".to_string(),
            ));
        }

        let silent = ctx.workspace.silent_video_path();
        let output = ctx.final_output().to_path_buf();

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| MuxError::Copy {
                    path: output.clone(),
                    source: e,
                })?;
            }
        }

        let ffprobe = &ctx.settings.tools.ffprobe;
        let has_audio =
            media::has_audio_stream(ffprobe, ctx.source()).map_err(MuxError::from)?;

        if !has_audio {
            ctx.logger
                .info("no audio stream in source; copying video unchanged");
            passthrough_copy(&silent, &output)?;
            state.mux = Some(MuxOutput {
                output_path: output,
                audio_carried: false,
                command: None,
            });
            return Ok(StepOutcome::Success);
        }

        ctx.logger.info("re-attaching original audio");

        let ffmpeg = &ctx.settings.tools.ffmpeg;
        let mut cmd = Command::new(ffmpeg);
        cmd.args(mux_args(&silent, ctx.source(), &output));
        let command = format!(
            "{} {}",
            ffmpeg,
            cmd.get_args()
                .map(|a| a.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
        tools::run_logged(&ctx.logger, ffmpeg, &mut cmd).map_err(MuxError::from)?;

        if !output.exists() {
            return Err(MuxError::NoOutput(output).into());
        }

        state.mux = Some(MuxOutput {
            output_path: output,
            audio_carried: true,
            command: Some(command),
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> PipelineResult<()> {
        let output = state.mux.as_ref().ok_or_else(|| PipelineError::InvalidOutput {
            stage: Stage::Mux,
            message: "mux results not recorded".to_string(),
        })?;

        if !output.output_path.exists() {
            return Err(PipelineError::InvalidOutput {
                stage: Stage::Mux,
                message: format!("final output missing: {}", output.output_path.display()),
            });
        }

        Ok(())
    }
}
