//! Enhance stage - per-frame super-resolution.
//!
//! This is the dominant cost center of a run. Frames are independent, so
//! the work fans out across a bounded worker pool; the pool always drains
//! fully before the stage reports completion, and a single failed frame
//! fails the whole run. Each output lands under the same basename as its
//! input, written to a hidden temp name first and renamed once complete so
//! downstream readers never observe a partial frame.

use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::frames::{self, FrameSequence};
use crate::pipeline::errors::{EnhancementError, PipelineError, PipelineResult, Stage};
use crate::pipeline::step::PipelineStep;
use crate::pipeline::types::{Context, EnhanceOutput, RunState, StepOutcome};

pub struct EnhanceStep;

impl EnhanceStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnhanceStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for EnhanceStep {
    fn name(&self) -> &str {
        "Enhance"
    }

    fn stage(&self) -> Stage {
        Stage::Enhance
    }

    fn description(&self) -> &str {
        "Upscale every frame with the super-resolution collaborator"
    }

    fn validate_input(&self, _ctx: &Context, state: &RunState) -> PipelineResult<()> {
        match state.frame_count() {
            Some(count) if count >= 1 => Ok(()),
            _ => Err(PipelineError::Precondition {
                stage: Stage::Enhance,
                message: "no extracted frame sequence to enhance".to_string(),
            }),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<StepOutcome> {
        let raw_dir = ctx.workspace.raw_frames_dir();
        let out_dir = ctx.workspace.enhanced_frames_dir();

        let input = FrameSequence::scan(&raw_dir).map_err(EnhancementError::from)?;
        let total = input.len() as u64;
        let workers = ctx.settings.enhance.workers.max(1);

        ctx.logger.info(&format!(
            "enhancing {} frames ({}x) with {} worker(s)",
            input.len(),
            ctx.upscaler.scale_factor(),
            workers
        ));

        let completed = AtomicU64::new(0);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(EnhancementError::from)?;

        // try_for_each is the completion barrier: the pool joins every
        // in-flight frame before this call returns, error or not.
        pool.install(|| {
            input
                .frames()
                .par_iter()
                .try_for_each(|frame| -> PipelineResult<()> {
                    if ctx.is_cancelled() {
                        return Err(PipelineError::Cancelled {
                            stage: Stage::Enhance,
                        });
                    }

                    let file_name = frames::frame_file_name(frame.index);
                    let final_path = out_dir.join(&file_name);
                    // Hidden temp name: same extension, never picked up by a scan.
                    let tmp_path = out_dir.join(format!(".{file_name}"));

                    ctx.upscaler
                        .enhance_frame(&frame.path, &tmp_path)
                        .map_err(|e| EnhancementError::Frame {
                            frame: file_name.clone(),
                            source: e,
                        })?;

                    fs::rename(&tmp_path, &final_path).map_err(|e| EnhancementError::Finalize {
                        frame: file_name.clone(),
                        source: e,
                    })?;

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    ctx.report_progress("Enhance", done, total);
                    Ok(())
                })
        })?;

        // Re-scan for the authoritative output ordering, then hold the
        // enhancer to its contract: same cardinality, same index set.
        let output = FrameSequence::scan(&out_dir).map_err(EnhancementError::from)?;
        if output.len() != input.len() {
            return Err(EnhancementError::CountMismatch {
                got: output.len(),
                expected: input.len(),
            }
            .into());
        }

        state.enhance = Some(EnhanceOutput {
            frame_count: output.len(),
            frames_dir: out_dir,
            scale: ctx.upscaler.scale_factor(),
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> PipelineResult<()> {
        let output = state.enhance.as_ref().ok_or_else(|| PipelineError::InvalidOutput {
            stage: Stage::Enhance,
            message: "enhancement results not recorded".to_string(),
        })?;

        let expected = state.frame_count().unwrap_or(0);
        if output.frame_count != expected {
            return Err(PipelineError::InvalidOutput {
                stage: Stage::Enhance,
                message: format!(
                    "enhanced {} frames but extractor produced {}",
                    output.frame_count, expected
                ),
            });
        }

        // Spot-check the first frame's dimensions against the probed
        // source size, when the probe reported one.
        let (src_w, src_h) = (ctx.source_info.width, ctx.source_info.height);
        if src_w > 0 && src_h > 0 {
            let first = output.frames_dir.join(frames::frame_file_name(0));
            let name = frames::frame_file_name(0);
            let (got_w, got_h) = image::image_dimensions(&first).map_err(|e| {
                PipelineError::Enhancement(EnhancementError::Unreadable {
                    frame: name.clone(),
                    source: e,
                })
            })?;
            let (want_w, want_h) = (src_w * output.scale, src_h * output.scale);
            if (got_w, got_h) != (want_w, want_h) {
                return Err(EnhancementError::WrongDimensions {
                    frame: name,
                    got_w,
                    got_h,
                    want_w,
                    want_h,
                    scale: output.scale,
                }
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testutil::{
        make_context, make_context_with, write_frame, BlankUpscaler, FailingUpscaler,
    };
    use crate::pipeline::types::ExtractOutput;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn seed_extracted(ctx: &Context, state: &mut RunState, count: u64) {
        let raw = ctx.workspace.raw_frames_dir();
        for i in 0..count {
            write_frame(&raw, i, 2, 2);
        }
        state.extract = Some(ExtractOutput {
            frame_count: count as usize,
            frames_dir: raw,
        });
    }

    #[test]
    fn preserves_cardinality_and_basenames() {
        let tmp = TempDir::new().unwrap();
        let ctx = make_context(&tmp);
        let mut state = RunState::new();
        seed_extracted(&ctx, &mut state, 3);

        let outcome = EnhanceStep::new().execute(&ctx, &mut state).unwrap();
        assert_eq!(outcome, StepOutcome::Success);

        let output = FrameSequence::scan(&ctx.workspace.enhanced_frames_dir()).unwrap();
        assert_eq!(output.len(), 3);
        for (i, frame) in output.frames().iter().enumerate() {
            assert_eq!(
                frame.path.file_name().unwrap().to_string_lossy(),
                frames::frame_file_name(i as u64)
            );
        }
    }

    #[test]
    fn no_temp_residue_after_success() {
        let tmp = TempDir::new().unwrap();
        let ctx = make_context(&tmp);
        let mut state = RunState::new();
        seed_extracted(&ctx, &mut state, 2);

        EnhanceStep::new().execute(&ctx, &mut state).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(ctx.workspace.enhanced_frames_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn single_frame_failure_fails_the_run() {
        let tmp = TempDir::new().unwrap();
        let ctx = make_context_with(&tmp, Arc::new(FailingUpscaler { fail_on: 1 }));
        let mut state = RunState::new();
        seed_extracted(&ctx, &mut state, 3);

        let err = EnhanceStep::new().execute(&ctx, &mut state).unwrap_err();
        match err {
            PipelineError::Enhancement(EnhancementError::Frame { frame, .. }) => {
                assert_eq!(frame, frames::frame_file_name(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parallel_workers_preserve_the_contract() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = make_context_with(&tmp, Arc::new(BlankUpscaler { scale: 2 }));
        ctx.settings.enhance.workers = 4;
        let mut state = RunState::new();
        seed_extracted(&ctx, &mut state, 16);

        EnhanceStep::new().execute(&ctx, &mut state).unwrap();
        let output = FrameSequence::scan(&ctx.workspace.enhanced_frames_dir()).unwrap();
        assert_eq!(output.len(), 16);
    }

    #[test]
    fn cancellation_is_honored_between_frames() {
        let tmp = TempDir::new().unwrap();
        let ctx = make_context(&tmp);
        let mut state = RunState::new();
        seed_extracted(&ctx, &mut state, 3);
        ctx.cancel_handle().cancel();

        let err = EnhanceStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { .. }));
    }

    #[test]
    fn dimension_spot_check_catches_wrong_scale() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = make_context_with(&tmp, Arc::new(BlankUpscaler { scale: 2 }));
        ctx.source_info.width = 2;
        ctx.source_info.height = 2;
        let mut state = RunState::new();
        seed_extracted(&ctx, &mut state, 1);

        EnhanceStep::new().execute(&ctx, &mut state).unwrap();

        // Claim a different scale than the collaborator actually applied.
        state.enhance.as_mut().unwrap().scale = 4;
        let err = EnhanceStep::new().validate_output(&ctx, &state).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Enhancement(EnhancementError::WrongDimensions { .. })
        ));
    }

    #[test]
    fn missing_extraction_fails_validation() {
        let tmp = TempDir::new().unwrap();
        let ctx = make_context(&tmp);
        let state = RunState::new();

        let err = EnhanceStep::new().validate_input(&ctx, &state).unwrap_err();
        assert!(matches!(err, PipelineError::Precondition { .. }));
    }
}
