//! Per-frame super-resolution via the external upscaling collaborator.

mod models;
mod upscaler;

pub use models::{default_cache_dir, ensure_model_weights, ModelError};
pub use upscaler::{RealEsrganUpscaler, Upscale, UpscaleError};
