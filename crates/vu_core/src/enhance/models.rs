//! Model weight acquisition and caching.
//!
//! The collaborator needs the model's .param/.bin files on disk. On first
//! use they are fetched from the published release into a per-user cache
//! directory; subsequent runs hit the cache and never touch the network.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;

const MODEL_RELEASE_URL: &str =
    "https://github.com/xinntao/Real-ESRGAN/releases/download/v0.2.5.0";
const MODEL_FILE_EXTENSIONS: &[&str] = &["param", "bin"];

/// Errors from acquiring model weights.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no cache directory available on this platform")]
    NoCacheDir,

    #[error("failed to create model cache at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("download of {url} failed: HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("failed to store model file: {0}")]
    Io(#[from] io::Error),
}

/// Per-user cache directory for downloaded model weights.
pub fn default_cache_dir() -> Result<PathBuf, ModelError> {
    ProjectDirs::from("", "", "video-upscale")
        .map(|dirs| dirs.cache_dir().join("models"))
        .ok_or(ModelError::NoCacheDir)
}

/// Ensure `<model>.param` and `<model>.bin` exist under `cache_dir`,
/// downloading them on first use.
///
/// Returns the directory to hand to the collaborator's model-dir flag.
pub fn ensure_model_weights(model: &str, cache_dir: &Path) -> Result<PathBuf, ModelError> {
    fs::create_dir_all(cache_dir).map_err(|e| ModelError::CreateDir {
        path: cache_dir.to_path_buf(),
        source: e,
    })?;

    for ext in MODEL_FILE_EXTENSIONS {
        let target = cache_dir.join(format!("{model}.{ext}"));
        if target.exists() {
            continue;
        }

        let url = format!("{MODEL_RELEASE_URL}/{model}.{ext}");
        tracing::info!("downloading model weights from {url}");
        download_to(&url, &target)?;
    }

    Ok(cache_dir.to_path_buf())
}

fn download_to(url: &str, target: &Path) -> Result<(), ModelError> {
    let mut response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        return Err(ModelError::Download {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    // Stream into a temp name first so an interrupted download never
    // masquerades as a cached model.
    let tmp = target.with_extension("download");
    let mut file = fs::File::create(&tmp)?;
    response.copy_to(&mut file)?;
    fs::rename(&tmp, target)?;

    tracing::debug!("stored model file at {}", target.display());
    Ok(())
}
