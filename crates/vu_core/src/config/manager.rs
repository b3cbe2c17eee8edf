//! Settings persistence.
//!
//! Writes go to a temp file first and are renamed into place, so a crash
//! mid-write never leaves a truncated settings file.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use super::settings::Settings;

/// Errors from config file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Load settings from `path`, falling back to defaults.
///
/// A missing file is normal (first run). An unparsable file is logged and
/// ignored rather than aborting the run over a config typo.
pub fn load_or_default(path: &Path) -> Settings {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(_) => return Settings::default(),
    };

    match toml::from_str(&text) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(
                "invalid settings file {}: {e}; using defaults",
                path.display()
            );
            Settings::default()
        }
    }
}

/// Save settings to `path` atomically.
pub fn save(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(settings)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
