//! The upscaling collaborator seam.
//!
//! The collaborator is a capability: hand it one raster image, get back a
//! spatially larger one. Everything this crate needs to know about it sits
//! behind the `Upscale` trait; the production implementation shells out to
//! realesrgan-ncnn-vulkan once per frame.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::tools::CommandFailure;

/// Errors from enhancing a single frame.
#[derive(Debug, Error)]
pub enum UpscaleError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    CommandFailed(CommandFailure),

    #[error("collaborator wrote no output at {0}")]
    NoOutput(PathBuf),
}

/// Capability seam for the super-resolution collaborator.
pub trait Upscale: Send + Sync {
    /// Upscale one raster image by the configured integer factor.
    fn enhance_frame(&self, input: &Path, output: &Path) -> Result<(), UpscaleError>;

    /// The fixed linear scale factor outputs are enlarged by.
    fn scale_factor(&self) -> u32;
}

/// realesrgan-ncnn-vulkan invocation.
///
/// Tiling and device selection are collaborator configuration, set once
/// here and never decided per frame.
#[derive(Debug, Clone)]
pub struct RealEsrganUpscaler {
    binary: PathBuf,
    model: String,
    model_dir: Option<PathBuf>,
    scale: u32,
    tile_size: u32,
    gpu_id: Option<i32>,
}

impl RealEsrganUpscaler {
    pub fn new(binary: impl Into<PathBuf>, model: impl Into<String>, scale: u32) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
            model_dir: None,
            scale,
            tile_size: 256,
            gpu_id: None,
        }
    }

    /// Directory holding the model's .param/.bin files.
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = Some(dir.into());
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// GPU id; -1 forces CPU per the tool's convention.
    pub fn with_gpu_id(mut self, gpu_id: i32) -> Self {
        self.gpu_id = Some(gpu_id);
        self
    }

    fn tool_name(&self) -> String {
        self.binary.to_string_lossy().to_string()
    }

    pub(crate) fn build_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            input.as_os_str().to_os_string(),
            "-o".into(),
            output.as_os_str().to_os_string(),
            "-n".into(),
            self.model.clone().into(),
            "-s".into(),
            self.scale.to_string().into(),
            "-t".into(),
            self.tile_size.to_string().into(),
            "-f".into(),
            "png".into(),
        ];
        if let Some(dir) = &self.model_dir {
            args.push("-m".into());
            args.push(dir.as_os_str().to_os_string());
        }
        if let Some(gpu) = self.gpu_id {
            args.push("-g".into());
            args.push(gpu.to_string().into());
        }
        args
    }
}

impl Upscale for RealEsrganUpscaler {
    fn enhance_frame(&self, input: &Path, output: &Path) -> Result<(), UpscaleError> {
        let result = Command::new(&self.binary)
            .args(self.build_args(input, output))
            .output()
            .map_err(|e| UpscaleError::Launch {
                tool: self.tool_name(),
                source: e,
            })?;

        if !result.status.success() {
            return Err(UpscaleError::CommandFailed(CommandFailure {
                tool: self.tool_name(),
                exit_code: result.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&result.stderr).to_string(),
            }));
        }

        if !output.exists() {
            return Err(UpscaleError::NoOutput(output.to_path_buf()));
        }

        Ok(())
    }

    fn scale_factor(&self) -> u32 {
        self.scale
    }
}
