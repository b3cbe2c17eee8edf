//! Stream probing via ffprobe.
//!
//! ffprobe is invoked with JSON output and the relevant fields are pulled
//! out of the stream objects. Absence of the expected fields signals
//! "no such stream".

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use thiserror::Error;

use crate::tools::CommandFailure;

use super::rate::FrameRate;

/// Errors from probing a media file.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("source file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to run {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    CommandFailed(CommandFailure),

    #[error("failed to parse ffprobe output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no video stream in {0}")]
    NoVideoStream(PathBuf),

    #[error("malformed frame rate '{raw}'")]
    MalformedRate { raw: String },
}

/// The probed properties of a source's first video stream.
#[derive(Debug, Clone)]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
    /// Declared rate, kept rational.
    pub rate: FrameRate,
}

/// Probe the first video stream of a file.
pub fn probe_video_stream(ffprobe: &str, path: &Path) -> Result<VideoStreamInfo, ProbeError> {
    if !path.exists() {
        return Err(ProbeError::FileNotFound(path.to_path_buf()));
    }

    tracing::debug!("probing video stream: {}", path.display());

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| ProbeError::Launch {
            tool: ffprobe.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(ProbeError::CommandFailed(CommandFailure {
            tool: ffprobe.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }));
    }

    let json: Value = serde_json::from_slice(&output.stdout)?;
    parse_video_stream(&json, path)
}

/// Pull the video stream fields out of ffprobe's JSON.
fn parse_video_stream(json: &Value, path: &Path) -> Result<VideoStreamInfo, ProbeError> {
    let stream = json
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .ok_or_else(|| ProbeError::NoVideoStream(path.to_path_buf()))?;

    let rate_raw = stream
        .get("r_frame_rate")
        .and_then(|v| v.as_str())
        .or_else(|| stream.get("avg_frame_rate").and_then(|v| v.as_str()))
        .ok_or_else(|| ProbeError::NoVideoStream(path.to_path_buf()))?;

    let rate = FrameRate::parse(rate_raw)?;

    let width = stream.get("width").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let height = stream.get("height").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

    Ok(VideoStreamInfo {
        width,
        height,
        rate,
    })
}

/// Whether the file carries at least one audio stream.
pub fn has_audio_stream(ffprobe: &str, path: &Path) -> Result<bool, ProbeError> {
    if !path.exists() {
        return Err(ProbeError::FileNotFound(path.to_path_buf()));
    }

    // csv=p=0 prints one "audio" line per audio stream.
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "a",
            "-show_entries",
            "stream=codec_type",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .map_err(|e| ProbeError::Launch {
            tool: ffprobe.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(ProbeError::CommandFailed(CommandFailure {
            tool: ffprobe.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).contains("audio"))
}
