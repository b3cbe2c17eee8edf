//! Core types for the pipeline.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{RunOptions, Settings};
use crate::enhance::Upscale;
use crate::logging::RunLogger;
use crate::media::{self, FrameRate, VideoStreamInfo};
use crate::workspace::Workspace;

/// Progress callback: (stage name, completed units, total units).
///
/// Emission order carries no information about output ordering; the
/// directory listings are the only authoritative order.
pub type ProgressCallback = Box<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Handle for cancelling a running pipeline.
///
/// Cancellation is honored at stage boundaries and between frames; an
/// in-flight external call runs to completion first.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only context passed to pipeline steps.
///
/// Steps read configuration and shared resources from here; everything
/// they produce goes into `RunState`.
pub struct Context {
    /// Application settings.
    pub settings: Settings,
    /// Per-run options.
    pub options: RunOptions,
    /// Probed properties of the source's video stream.
    pub source_info: VideoStreamInfo,
    /// Resolved source rate (override or probed), immutable for the run.
    pub source_rate: FrameRate,
    /// The temporary tree owned by this run.
    pub workspace: Arc<Workspace>,
    /// The upscaling collaborator.
    pub upscaler: Arc<dyn Upscale>,
    /// Per-run logger.
    pub logger: Arc<RunLogger>,
    progress: Option<ProgressCallback>,
    cancel: CancelHandle,
}

impl Context {
    pub fn new(
        settings: Settings,
        options: RunOptions,
        source_info: VideoStreamInfo,
        source_rate: FrameRate,
        workspace: Arc<Workspace>,
        upscaler: Arc<dyn Upscale>,
        logger: Arc<RunLogger>,
    ) -> Self {
        Self {
            settings,
            options,
            source_info,
            source_rate,
            workspace,
            upscaler,
            logger,
            progress: None,
            cancel: CancelHandle::new(),
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Adopt an externally owned cancel handle.
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = handle;
        self
    }

    /// Report progress to the callback (if set).
    pub fn report_progress(&self, stage: &str, completed: u64, total: u64) {
        if let Some(ref callback) = self.progress {
            callback(stage, completed, total);
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn source(&self) -> &Path {
        &self.options.input
    }

    pub fn final_output(&self) -> &Path {
        &self.options.output
    }

    pub fn target_rate(&self) -> FrameRate {
        self.options.target_rate
    }

    /// Still images skip the interpolate and mux stages.
    pub fn is_still_image(&self) -> bool {
        media::is_still_image(&self.options.input)
    }
}

/// Mutable run state that accumulates results from pipeline stages.
///
/// This is a write-once manifest: each stage records its output in its own
/// section and never overwrites another's.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    /// When the run started.
    pub started_at: Option<String>,
    /// Extraction results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractOutput>,
    /// Enhancement results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhance: Option<EnhanceOutput>,
    /// Interpolation results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpolate: Option<InterpolateOutput>,
    /// Mux results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux: Option<MuxOutput>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub fn has_extraction(&self) -> bool {
        self.extract.is_some()
    }

    pub fn has_enhancement(&self) -> bool {
        self.enhance.is_some()
    }

    /// Frame count established by the extractor.
    pub fn frame_count(&self) -> Option<usize> {
        self.extract.as_ref().map(|e| e.frame_count)
    }
}

/// Output from the extract stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOutput {
    pub frame_count: usize,
    pub frames_dir: PathBuf,
}

/// Output from the enhance stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceOutput {
    pub frame_count: usize,
    pub frames_dir: PathBuf,
    pub scale: u32,
}

/// Output from the interpolate stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolateOutput {
    pub silent_video: PathBuf,
    pub source_rate: FrameRate,
    pub target_rate: FrameRate,
    pub command: String,
}

/// Output from the mux stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxOutput {
    pub output_path: PathBuf,
    /// Whether the original audio was carried over (false = pass-through
    /// copy of the silent video).
    pub audio_carried: bool,
    /// The mux command, absent on pass-through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step determined it does not apply (not an error).
    Skipped(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_state_tracks_completion() {
        let mut state = RunState::new();
        assert!(!state.has_extraction());
        assert_eq!(state.frame_count(), None);

        state.extract = Some(ExtractOutput {
            frame_count: 10,
            frames_dir: PathBuf::from("/tmp/raw"),
        });

        assert!(state.has_extraction());
        assert_eq!(state.frame_count(), Some(10));
    }

    #[test]
    fn run_state_serializes() {
        let state = RunState::new();
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("started_at"));
        assert!(!json.contains("extract"));
    }

    #[test]
    fn cancel_handle_flags() {
        let handle = CancelHandle::new();
        assert!(!handle.is_cancelled());
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
    }
}
