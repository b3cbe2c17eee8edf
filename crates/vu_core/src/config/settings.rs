//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field has a default so a partial file (or no file) still yields a
//! working configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool names/paths.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Enhancement collaborator settings.
    #[serde(default)]
    pub enhance: EnhanceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            tools: ToolSettings::default(),
            enhance: EnhanceSettings::default(),
        }
    }
}

/// Workspace and log locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root of the temporary workspace. Destroyed and recreated per run.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: String,

    /// Folder for run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_workspace_root() -> String {
    "temp_upscale".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Names (or explicit paths) of the external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

/// Configuration handed to the upscaling collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceSettings {
    /// Collaborator executable.
    #[serde(default = "default_enhance_binary")]
    pub binary: String,

    /// Model name the collaborator loads.
    #[serde(default = "default_model")]
    pub model: String,

    /// Linear upscale factor.
    #[serde(default = "default_scale")]
    pub scale: u32,

    /// Tile size bounding collaborator memory on large frames.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    /// GPU id for the collaborator; -1 forces CPU, `None` leaves it to
    /// the tool's own default.
    #[serde(default)]
    pub gpu_id: Option<i32>,

    /// Worker threads for the per-frame fan-out.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Directory holding model weights. `None` uses the cache directory,
    /// downloading the weights on first use.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
}

fn default_enhance_binary() -> String {
    "realesrgan-ncnn-vulkan".to_string()
}

fn default_model() -> String {
    "realesrgan-x4plus".to_string()
}

fn default_scale() -> u32 {
    4
}

fn default_tile_size() -> u32 {
    256
}

fn default_workers() -> usize {
    1
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            binary: default_enhance_binary(),
            model: default_model(),
            scale: default_scale(),
            tile_size: default_tile_size(),
            gpu_id: None,
            workers: default_workers(),
            model_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let settings = Settings::default();
        assert_eq!(settings.paths.workspace_root, "temp_upscale");
        assert_eq!(settings.tools.ffmpeg, "ffmpeg");
        assert_eq!(settings.enhance.scale, 4);
        assert_eq!(settings.enhance.workers, 1);
        assert!(settings.enhance.model_dir.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [enhance]
            scale = 2
            gpu_id = 0
            "#,
        )
        .unwrap();

        assert_eq!(settings.enhance.scale, 2);
        assert_eq!(settings.enhance.gpu_id, Some(0));
        assert_eq!(settings.enhance.model, "realesrgan-x4plus");
        assert_eq!(settings.paths.workspace_root, "temp_upscale");
    }

    #[test]
    fn settings_round_trip() {
        let mut settings = Settings::default();
        settings.enhance.workers = 4;
        settings.paths.workspace_root = "scratch".to_string();

        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed.enhance.workers, 4);
        assert_eq!(parsed.paths.workspace_root, "scratch");
    }
}
