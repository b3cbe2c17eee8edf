//! Temporary workspace owned by a single pipeline run.
//!
//! The workspace lives at a fixed, well-known relative path. Creation
//! destroys any stale tree at that path first, so artifacts from an
//! earlier run can never leak into this one. Removal happens in `Drop`,
//! which makes cleanup a scoped-resource release that runs on every exit
//! path - success, error return, or panic - unless retention was
//! requested.
//!
//! Concurrent runs against the same workspace path are not supported;
//! exclusivity per path is the caller's responsibility.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const RAW_FRAMES_DIR: &str = "raw_frames";
pub const ENHANCED_FRAMES_DIR: &str = "enhanced_frames";
pub const VIDEO_DIR: &str = "video";
const SILENT_VIDEO_FILE: &str = "interpolated_silent.mp4";

/// Errors from workspace setup.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to clear stale workspace at {path}: {source}")]
    Clear {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create workspace directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The on-disk temporary tree for one run.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    retain: bool,
}

impl Workspace {
    /// Destroy any stale tree at `root` and create a fresh layout.
    pub fn create(root: impl Into<PathBuf>, retain: bool) -> Result<Self, WorkspaceError> {
        let root = root.into();

        if root.exists() {
            tracing::debug!("removing stale workspace at {}", root.display());
            fs::remove_dir_all(&root).map_err(|e| WorkspaceError::Clear {
                path: root.clone(),
                source: e,
            })?;
        }

        let workspace = Self { root, retain };
        for dir in [
            workspace.raw_frames_dir(),
            workspace.enhanced_frames_dir(),
            workspace.video_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| WorkspaceError::Create {
                path: dir.clone(),
                source: e,
            })?;
        }

        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the extractor writes and the enhancer reads.
    pub fn raw_frames_dir(&self) -> PathBuf {
        self.root.join(RAW_FRAMES_DIR)
    }

    /// Where the enhancer writes and the interpolator reads.
    pub fn enhanced_frames_dir(&self) -> PathBuf {
        self.root.join(ENHANCED_FRAMES_DIR)
    }

    pub fn video_dir(&self) -> PathBuf {
        self.root.join(VIDEO_DIR)
    }

    /// The silent intermediate the interpolator writes and the muxer reads.
    pub fn silent_video_path(&self) -> PathBuf {
        self.video_dir().join(SILENT_VIDEO_FILE)
    }

    pub fn is_retained(&self) -> bool {
        self.retain
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.retain {
            tracing::info!("retaining workspace at {}", self.root.display());
            return;
        }
        match fs::remove_dir_all(&self.root) {
            Ok(()) => tracing::debug!("removed workspace at {}", self.root.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to remove workspace {}: {}", self.root.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_expected_layout() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("ws");
        let ws = Workspace::create(&root, false).unwrap();

        assert!(ws.raw_frames_dir().is_dir());
        assert!(ws.enhanced_frames_dir().is_dir());
        assert!(ws.video_dir().is_dir());
        assert!(ws.silent_video_path().starts_with(ws.video_dir()));
    }

    #[test]
    fn stale_artifacts_are_destroyed() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("ws");

        // Simulate leftovers from a previous run.
        fs::create_dir_all(root.join(RAW_FRAMES_DIR)).unwrap();
        fs::write(root.join(RAW_FRAMES_DIR).join("frame_0000000.png"), b"old").unwrap();

        let ws = Workspace::create(&root, false).unwrap();
        assert!(!ws.raw_frames_dir().join("frame_0000000.png").exists());
    }

    #[test]
    fn drop_removes_workspace() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("ws");
        {
            let ws = Workspace::create(&root, false).unwrap();
            fs::write(ws.raw_frames_dir().join("frame_0000000.png"), b"data").unwrap();
        }
        assert!(!root.exists());
    }

    #[test]
    fn drop_runs_on_error_paths() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("ws");

        fn failing_run(root: &Path) -> Result<(), String> {
            let _ws = Workspace::create(root, false).map_err(|e| e.to_string())?;
            Err("stage failure".to_string())
        }

        assert!(failing_run(&root).is_err());
        assert!(!root.exists());
    }

    #[test]
    fn retention_preserves_tree() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("ws");
        {
            let _ws = Workspace::create(&root, true).unwrap();
        }
        assert!(root.exists());
    }

    #[test]
    fn drop_tolerates_already_removed_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("ws");
        let ws = Workspace::create(&root, false).unwrap();
        fs::remove_dir_all(&root).unwrap();
        drop(ws);
    }
}
