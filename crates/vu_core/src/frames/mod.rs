//! Frame naming scheme and sequence scanning.
//!
//! Frames on disk are named `frame_NNNNNNN.png` with a 7-digit zero-padded
//! index starting at 0. The fixed width makes lexicographic order equal to
//! numeric order, but scans still sort by the parsed index - the directory
//! listing after a stage completes is the authoritative ordering for every
//! downstream stage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const FRAME_PREFIX: &str = "frame_";
pub const INDEX_WIDTH: usize = 7;
pub const FRAME_EXT: &str = "png";

/// Filename for the frame at `index`.
pub fn frame_file_name(index: u64) -> String {
    format!("{FRAME_PREFIX}{index:0width$}.{FRAME_EXT}", width = INDEX_WIDTH)
}

/// printf-style pattern handed to the decode/interpolation collaborators.
pub fn sequence_pattern() -> String {
    format!("{FRAME_PREFIX}%0{INDEX_WIDTH}d.{FRAME_EXT}")
}

/// Parse the numeric component out of a frame filename.
///
/// Only exact matches of the naming scheme count; anything else (temp
/// files, foreign files) is not part of the sequence.
pub fn parse_frame_index(file_name: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix(FRAME_PREFIX)?
        .strip_suffix(".png")?;
    if digits.len() != INDEX_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// One frame artifact of a sequence.
#[derive(Debug, Clone)]
pub struct FrameRef {
    pub index: u64,
    pub path: PathBuf,
}

/// Errors from scanning a frame directory.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("failed to scan {dir}: {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("frame sequence in {dir} is not contiguous: expected index {expected}, found {found}")]
    NonContiguous {
        dir: PathBuf,
        expected: u64,
        found: u64,
    },
}

/// An ordered, contiguously-indexed set of frame artifacts.
#[derive(Debug, Clone, Default)]
pub struct FrameSequence {
    frames: Vec<FrameRef>,
}

impl FrameSequence {
    /// Scan a directory and build the authoritative ordering.
    ///
    /// Frames are sorted by their parsed numeric index and must form a
    /// gap-free run starting at 0. Since every sequence is contiguous from
    /// zero, two sequences with equal cardinality carry the identical
    /// index set.
    pub fn scan(dir: &Path) -> Result<Self, SequenceError> {
        let entries = fs::read_dir(dir).map_err(|e| SequenceError::Io {
            dir: dir.to_path_buf(),
            source: e,
        })?;

        let mut frames = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SequenceError::Io {
                dir: dir.to_path_buf(),
                source: e,
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(index) = parse_frame_index(name) {
                frames.push(FrameRef {
                    index,
                    path: entry.path(),
                });
            }
        }

        frames.sort_unstable_by_key(|frame| frame.index);

        for (expected, frame) in frames.iter().enumerate() {
            if frame.index != expected as u64 {
                return Err(SequenceError::NonContiguous {
                    dir: dir.to_path_buf(),
                    expected: expected as u64,
                    found: frame.index,
                });
            }
        }

        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[FrameRef] {
        &self.frames
    }

    pub fn first(&self) -> Option<&FrameRef> {
        self.frames.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn names_are_zero_padded() {
        assert_eq!(frame_file_name(0), "frame_0000000.png");
        assert_eq!(frame_file_name(42), "frame_0000042.png");
        assert_eq!(frame_file_name(1234567), "frame_1234567.png");
        assert_eq!(sequence_pattern(), "frame_%07d.png");
    }

    #[test]
    fn index_parsing_is_strict() {
        assert_eq!(parse_frame_index("frame_0000000.png"), Some(0));
        assert_eq!(parse_frame_index("frame_0000042.png"), Some(42));
        assert_eq!(parse_frame_index("frame_042.png"), None);
        assert_eq!(parse_frame_index("frame_0000042.jpg"), None);
        assert_eq!(parse_frame_index("other_0000042.png"), None);
        assert_eq!(parse_frame_index(".frame_0000042.png"), None);
        assert_eq!(parse_frame_index("frame_00000a2.png"), None);
    }

    #[test]
    fn scan_orders_numerically() {
        let dir = TempDir::new().unwrap();
        for i in [3u64, 0, 2, 1, 4] {
            touch(dir.path(), &frame_file_name(i));
        }

        let seq = FrameSequence::scan(dir.path()).unwrap();
        assert_eq!(seq.len(), 5);
        let indices: Vec<u64> = seq.frames().iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn lexicographic_equals_numeric() {
        let dir = TempDir::new().unwrap();
        for i in 0..12u64 {
            touch(dir.path(), &frame_file_name(i));
        }

        let seq = FrameSequence::scan(dir.path()).unwrap();
        let names: Vec<String> = seq
            .frames()
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn gaps_are_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &frame_file_name(0));
        touch(dir.path(), &frame_file_name(2));

        let result = FrameSequence::scan(dir.path());
        assert!(matches!(
            result,
            Err(SequenceError::NonContiguous {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn sequence_must_start_at_zero() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &frame_file_name(1));

        let result = FrameSequence::scan(dir.path());
        assert!(matches!(result, Err(SequenceError::NonContiguous { .. })));
    }

    #[test]
    fn foreign_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &frame_file_name(0));
        touch(dir.path(), "cover.png");
        touch(dir.path(), ".frame_0000001.png");
        touch(dir.path(), "notes.txt");

        let seq = FrameSequence::scan(dir.path()).unwrap();
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn empty_directory_scans_empty() {
        let dir = TempDir::new().unwrap();
        let seq = FrameSequence::scan(dir.path()).unwrap();
        assert!(seq.is_empty());
    }
}
