//! Typed errors for the pipeline and its stages.
//!
//! Each stage owns an error kind carrying the failing external command's
//! exit information; `PipelineError` unions them so the caller always
//! knows which stage a run died in.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::enhance::{ModelError, UpscaleError};
use crate::frames::SequenceError;
use crate::media::ProbeError;
use crate::tools::{MissingToolError, ToolInvocationError};
use crate::workspace::WorkspaceError;

/// Identity of a pipeline stage, for progress and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Probe,
    Extract,
    Enhance,
    Interpolate,
    Mux,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Probe => "Probe",
            Stage::Extract => "Extract",
            Stage::Enhance => "Enhance",
            Stage::Interpolate => "Interpolate",
            Stage::Mux => "Mux",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Frame extraction failures.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Tool(#[from] ToolInvocationError),

    #[error("decoder produced no frames in {0}")]
    NoFrames(PathBuf),

    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

/// Frame enhancement failures.
///
/// Any single-frame failure is fatal to the run: a missing frame would
/// desynchronize the sequence the interpolator consumes.
#[derive(Debug, Error)]
pub enum EnhancementError {
    #[error("model weights unavailable: {0}")]
    Model(#[from] ModelError),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("frame '{frame}' failed to enhance: {source}")]
    Frame {
        frame: String,
        #[source]
        source: UpscaleError,
    },

    #[error("failed to finalize frame '{frame}': {source}")]
    Finalize {
        frame: String,
        #[source]
        source: io::Error,
    },

    #[error("frame '{frame}' could not be read back: {source}")]
    Unreadable {
        frame: String,
        #[source]
        source: image::ImageError,
    },

    #[error("frame '{frame}' is {got_w}x{got_h}, expected {want_w}x{want_h} ({scale}x)")]
    WrongDimensions {
        frame: String,
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
        scale: u32,
    },

    #[error("enhanced sequence has {got} frames, expected {expected}")]
    CountMismatch { got: usize, expected: usize },

    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

/// Interpolation failures.
#[derive(Debug, Error)]
pub enum InterpolationError {
    #[error(transparent)]
    Tool(#[from] ToolInvocationError),

    #[error("interpolator wrote no output at {0}")]
    NoOutput(PathBuf),
}

/// Audio re-attachment failures.
#[derive(Debug, Error)]
pub enum MuxError {
    #[error(transparent)]
    Tool(#[from] ToolInvocationError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("failed to copy video to {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("muxer wrote no output at {0}")]
    NoOutput(PathBuf),
}

/// Top-level pipeline error.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("frame extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("frame enhancement failed: {0}")]
    Enhancement(#[from] EnhancementError),

    #[error("frame interpolation failed: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("audio mux failed: {0}")]
    Mux(#[from] MuxError),

    #[error("workspace setup failed: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    MissingTool(#[from] MissingToolError),

    #[error("failed to create run log: {source}")]
    Logging {
        #[source]
        source: io::Error,
    },

    #[error("precondition failed in stage {stage}: {message}")]
    Precondition { stage: Stage, message: String },

    #[error("invalid output from stage {stage}: {message}")]
    InvalidOutput { stage: Stage, message: String },

    #[error("run cancelled before stage {stage}")]
    Cancelled { stage: Stage },
}

impl PipelineError {
    /// The stage this failure surfaced from, when attributable.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Probe(_) => Some(Stage::Probe),
            PipelineError::Extraction(_) => Some(Stage::Extract),
            PipelineError::Enhancement(_) => Some(Stage::Enhance),
            PipelineError::Interpolation(_) => Some(Stage::Interpolate),
            PipelineError::Mux(_) => Some(Stage::Mux),
            PipelineError::Precondition { stage, .. }
            | PipelineError::InvalidOutput { stage, .. }
            | PipelineError::Cancelled { stage } => Some(*stage),
            PipelineError::Workspace(_)
            | PipelineError::MissingTool(_)
            | PipelineError::Logging { .. } => None,
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
