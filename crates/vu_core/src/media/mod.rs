//! Source media inspection: stream probing and frame-rate arithmetic.

mod probe;
mod rate;

pub use probe::{has_audio_stream, probe_video_stream, ProbeError, VideoStreamInfo};
pub use rate::FrameRate;

use std::path::Path;

/// Extensions treated as still-image inputs.
///
/// A still image runs through extraction and enhancement like a one-frame
/// video; the interpolation and mux stages skip themselves.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];

/// Whether the input is a still image rather than a video.
pub fn is_still_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|i| ext.eq_ignore_ascii_case(i)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_detected() {
        assert!(is_still_image(Path::new("photo.png")));
        assert!(is_still_image(Path::new("photo.JPG")));
        assert!(!is_still_image(Path::new("movie.mp4")));
        assert!(!is_still_image(Path::new("movie.mkv")));
        assert!(!is_still_image(Path::new("no_extension")));
    }
}
