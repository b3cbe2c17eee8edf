//! Configuration: persistent settings and per-run options.

mod manager;
mod settings;

pub use manager::{load_or_default, save, ConfigError};
pub use settings::{EnhanceSettings, PathSettings, Settings, ToolSettings};

use std::path::PathBuf;

use crate::media::FrameRate;

/// Parameters scoped to a single pipeline run.
///
/// These are passed explicitly into the coordinator rather than living in
/// any global state; a new run gets a new value.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Source video (or still image).
    pub input: PathBuf,
    /// Final artifact path.
    pub output: PathBuf,
    /// Rate the interpolator resamples to.
    pub target_rate: FrameRate,
    /// Explicit source-rate override in Hz; `None` probes the source.
    pub rate_override: Option<f64>,
    /// Keep the workspace after the run instead of destroying it.
    pub retain_workspace: bool,
}
