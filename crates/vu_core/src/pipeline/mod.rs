//! Pipeline orchestration.
//!
//! A run is a linear sequence of stages over a shared workspace:
//!
//! ```text
//! Pipeline
//!     ├── Stage: Extract      source video  -> raw_frames/
//!     ├── Stage: Enhance      raw_frames/   -> enhanced_frames/
//!     ├── Stage: Interpolate  enhanced_frames/ -> video/interpolated_silent.mp4
//!     └── Stage: Mux          silent video + source audio -> final output
//! ```
//!
//! Stages never overlap: each one fully consumes its input directory
//! before the next may read it. The only mutable state crossing a stage
//! boundary is the workspace handoff location plus the `RunState`
//! manifest.

mod errors;
#[allow(clippy::module_inception)]
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use errors::{
    EnhancementError, ExtractionError, InterpolationError, MuxError, PipelineError,
    PipelineResult, Stage,
};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{EnhanceStep, ExtractStep, InterpolateStep, MuxStep};
pub use types::{
    CancelHandle, Context, EnhanceOutput, ExtractOutput, InterpolateOutput, MuxOutput,
    ProgressCallback, RunState, StepOutcome,
};

/// Create the standard pipeline with all stages in order.
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(ExtractStep::new())
        .with_step(EnhanceStep::new())
        .with_step(InterpolateStep::new())
        .with_step(MuxStep::new())
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::Path;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::config::{RunOptions, Settings};
    use crate::enhance::{Upscale, UpscaleError};
    use crate::frames;
    use crate::logging::{LogConfig, RunLogger};
    use crate::media::{FrameRate, VideoStreamInfo};
    use crate::workspace::Workspace;

    use super::types::Context;

    /// Stand-in collaborator: writes a blank image scaled by the factor.
    pub(crate) struct BlankUpscaler {
        pub scale: u32,
    }

    impl Upscale for BlankUpscaler {
        fn enhance_frame(&self, input: &Path, output: &Path) -> Result<(), UpscaleError> {
            let (w, h) = image::image_dimensions(input)
                .map_err(|_| UpscaleError::NoOutput(input.to_path_buf()))?;
            image::RgbImage::new(w * self.scale, h * self.scale)
                .save(output)
                .map_err(|_| UpscaleError::NoOutput(output.to_path_buf()))?;
            Ok(())
        }

        fn scale_factor(&self) -> u32 {
            self.scale
        }
    }

    /// Collaborator that fails on one specific frame index.
    pub(crate) struct FailingUpscaler {
        pub fail_on: u64,
    }

    impl Upscale for FailingUpscaler {
        fn enhance_frame(&self, input: &Path, output: &Path) -> Result<(), UpscaleError> {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if frames::parse_frame_index(&name) == Some(self.fail_on) {
                return Err(UpscaleError::NoOutput(input.to_path_buf()));
            }
            BlankUpscaler { scale: 4 }.enhance_frame(input, output)
        }

        fn scale_factor(&self) -> u32 {
            4
        }
    }

    /// Write a real PNG frame with the canonical name into `dir`.
    pub(crate) fn write_frame(dir: &Path, index: u64, w: u32, h: u32) {
        image::RgbImage::new(w, h)
            .save(dir.join(frames::frame_file_name(index)))
            .unwrap();
    }

    pub(crate) fn make_context(tmp: &TempDir) -> Context {
        make_context_with(tmp, Arc::new(BlankUpscaler { scale: 4 }))
    }

    pub(crate) fn make_context_with(tmp: &TempDir, upscaler: Arc<dyn Upscale>) -> Context {
        let workspace = Arc::new(Workspace::create(tmp.path().join("ws"), false).unwrap());
        let logger = Arc::new(
            RunLogger::new("test", tmp.path().join("logs"), LogConfig::default()).unwrap(),
        );
        let rate = FrameRate::new(30, 1).unwrap();
        let options = RunOptions {
            input: tmp.path().join("input.mp4"),
            output: tmp.path().join("out.mp4"),
            target_rate: FrameRate::new(60, 1).unwrap(),
            rate_override: None,
            retain_workspace: false,
        };
        let source_info = VideoStreamInfo {
            width: 0,
            height: 0,
            rate,
        };
        Context::new(
            Settings::default(),
            options,
            source_info,
            rate,
            workspace,
            upscaler,
            logger,
        )
    }
}
