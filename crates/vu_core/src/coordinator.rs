//! Pipeline coordinator.
//!
//! Owns the workspace for the duration of one run, sequences the stages,
//! and guarantees cleanup on every exit path. Either the full pipeline
//! completes and produces one final artifact, or no output is valid.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{RunOptions, Settings};
use crate::enhance::{self, RealEsrganUpscaler, Upscale};
use crate::frames::FrameSequence;
use crate::logging::{LogConfig, RunLogger};
use crate::media::{self, FrameRate, VideoStreamInfo};
use crate::pipeline::{
    create_standard_pipeline, CancelHandle, Context, EnhancementError, MuxError, PipelineError,
    PipelineResult, ProgressCallback, RunState, Stage,
};
use crate::tools;
use crate::workspace::Workspace;

/// The final report of a successful run.
///
/// `final_info` comes from re-probing the produced artifact and is used
/// only for reporting, never for decisions; a failed re-probe just leaves
/// it empty.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub output_path: PathBuf,
    pub source_rate: FrameRate,
    pub target_rate: FrameRate,
    pub frames_extracted: usize,
    pub audio_carried: bool,
    pub steps_skipped: Vec<String>,
    pub final_info: Option<VideoStreamInfo>,
    pub log_path: PathBuf,
}

/// Coordinates one pipeline run end to end.
pub struct Coordinator {
    settings: Settings,
}

impl Coordinator {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the full pipeline.
    pub fn run(&self, options: RunOptions) -> PipelineResult<PipelineReport> {
        self.run_with(options, None, None)
    }

    /// Run the full pipeline with progress reporting and cancellation.
    pub fn run_with(
        &self,
        options: RunOptions,
        progress: Option<ProgressCallback>,
        cancel: Option<CancelHandle>,
    ) -> PipelineResult<PipelineReport> {
        // Typed capability probe before any work starts.
        tools::verify_required(&[
            self.settings.tools.ffmpeg.as_str(),
            self.settings.tools.ffprobe.as_str(),
            self.settings.enhance.binary.as_str(),
        ])?;

        let run_name = options
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "run".to_string());
        let logger = Arc::new(
            RunLogger::new(&run_name, &self.settings.paths.logs_folder, LogConfig::default())
                .map_err(|e| PipelineError::Logging { source: e })?,
        );
        logger.info(&format!("run log: {}", logger.log_path().display()));

        // Resolve the source rate once; it is immutable for the run.
        let source_info = media::probe_video_stream(
            &self.settings.tools.ffprobe,
            &options.input,
        )?;
        let source_rate = match options.rate_override {
            Some(hz) => FrameRate::from_hz(hz)?,
            None => source_info.rate,
        };
        logger.info(&format!(
            "source: {}x{} @ {:.3} fps ({})",
            source_info.width,
            source_info.height,
            source_rate.as_f64(),
            source_rate
        ));

        let upscaler = self.build_upscaler(&logger)?;

        // Fresh workspace; any stale tree at this path is destroyed first.
        // The Drop guard removes it again on every exit path below unless
        // retention was requested.
        let workspace = Arc::new(Workspace::create(
            &self.settings.paths.workspace_root,
            options.retain_workspace,
        )?);
        logger.info(&format!("workspace: {}", workspace.root().display()));
        if workspace.is_retained() {
            logger.info("workspace will be kept after the run");
        }

        let still_image = media::is_still_image(&options.input);
        let target_rate = options.target_rate;
        let output_path = options.output.clone();

        let mut ctx = Context::new(
            self.settings.clone(),
            options,
            source_info,
            source_rate,
            Arc::clone(&workspace),
            upscaler,
            Arc::clone(&logger),
        );
        if let Some(callback) = progress {
            ctx = ctx.with_progress_callback(callback);
        }
        if let Some(handle) = cancel {
            ctx = ctx.with_cancel(handle);
        }

        let mut state = RunState::new();
        let pipeline = create_standard_pipeline();
        let run_result = pipeline.run(&ctx, &mut state)?;

        // Still-image supplement: the temporal stages skipped themselves;
        // the artifact is the first enhanced frame.
        if still_image {
            self.copy_first_enhanced_frame(&ctx)?;
        }

        if let Ok(manifest) = serde_json::to_string(&state) {
            logger.debug(&format!("run manifest: {manifest}"));
        }

        // Re-probe the artifact purely for reporting.
        let final_info =
            media::probe_video_stream(&self.settings.tools.ffprobe, &output_path).ok();
        if final_info.is_none() {
            logger.warn("could not re-probe final artifact; omitting report detail");
        }

        logger.success(&format!("output written to {}", output_path.display()));

        Ok(PipelineReport {
            output_path,
            source_rate,
            target_rate,
            frames_extracted: state.frame_count().unwrap_or(0),
            audio_carried: state.mux.as_ref().map(|m| m.audio_carried).unwrap_or(false),
            steps_skipped: run_result.steps_skipped,
            final_info,
            log_path: logger.log_path().to_path_buf(),
        })
    }

    /// Configure the upscaling collaborator, fetching model weights into
    /// the cache on first use.
    fn build_upscaler(&self, logger: &RunLogger) -> PipelineResult<Arc<dyn Upscale>> {
        let enhance = &self.settings.enhance;

        let model_dir = match &enhance.model_dir {
            Some(dir) => dir.clone(),
            None => {
                let cache = enhance::default_cache_dir()
                    .map_err(EnhancementError::from)?;
                logger.debug(&format!("model cache: {}", cache.display()));
                enhance::ensure_model_weights(&enhance.model, &cache)
                    .map_err(EnhancementError::from)?
            }
        };

        let mut upscaler =
            RealEsrganUpscaler::new(&enhance.binary, &enhance.model, enhance.scale)
                .with_model_dir(model_dir)
                .with_tile_size(enhance.tile_size);
        if let Some(gpu) = enhance.gpu_id {
            upscaler = upscaler.with_gpu_id(gpu);
        }

        Ok(Arc::new(upscaler))
    }

    fn copy_first_enhanced_frame(&self, ctx: &Context) -> PipelineResult<()> {
        let sequence = FrameSequence::scan(&ctx.workspace.enhanced_frames_dir())
            .map_err(EnhancementError::from)?;
        let first = sequence.first().ok_or_else(|| PipelineError::InvalidOutput {
            stage: Stage::Enhance,
            message: "no enhanced frame to copy".to_string(),
        })?;

        ctx.logger.info("saving upscaled image");
        fs::copy(&first.path, ctx.final_output()).map_err(|e| {
            PipelineError::Mux(MuxError::Copy {
                path: ctx.final_output().to_path_buf(),
                source: e,
            })
        })?;
        Ok(())
    }
}
