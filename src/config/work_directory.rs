//! Temporary work directories.
//!
//! Every engine instance stages scenes, pipeline files and textures in a
//! directory of its own, named by a fresh GUID below the data root. The
//! directory and everything in it is removed when the handle is dropped.

use super::ensure_app_data_dir;
use crate::error::{Result, SgError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const ORIGINAL_TEXTURES_DIR: &str = "OriginalTextures";
const BAKED_TEXTURES_DIR: &str = "BakedTextures";
const TEXTURES_DIR: &str = "Textures";

#[derive(Debug)]
pub struct WorkDirectory {
    path: PathBuf,
    import_dir: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    texture_output_override: Option<PathBuf>,
    keep: bool,
}

impl WorkDirectory {
    /// Create a work directory below the data root.
    pub fn new() -> Result<Self> {
        let root = ensure_app_data_dir()?;
        Self::in_root(root)
    }

    /// Create a work directory below `root`.
    pub fn in_root(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();

        let path = loop {
            let candidate = root.join(Uuid::new_v4().to_string());
            if !candidate.exists() {
                break candidate;
            }
        };

        for dir in [
            path.clone(),
            path.join(ORIGINAL_TEXTURES_DIR),
            path.join(BAKED_TEXTURES_DIR),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                SgError::IoFailure(format!("Failed to create work directory {:?}: {}", dir, e))
            })?;
        }

        debug!("Created work directory {:?}", path);
        Ok(Self {
            path,
            import_dir: None,
            export_dir: None,
            texture_output_override: None,
            keep: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_textures_dir(&self) -> PathBuf {
        self.path.join(ORIGINAL_TEXTURES_DIR)
    }

    pub fn baked_textures_dir(&self) -> PathBuf {
        self.path.join(BAKED_TEXTURES_DIR)
    }

    /// Directory scenes are imported from; the work directory by default.
    pub fn import_dir(&self) -> &Path {
        self.import_dir.as_deref().unwrap_or(&self.path)
    }

    pub fn set_import_dir(&mut self, dir: impl Into<PathBuf>) {
        self.import_dir = Some(dir.into());
    }

    /// Directory scenes are exported to; the work directory by default.
    pub fn export_dir(&self) -> &Path {
        self.export_dir.as_deref().unwrap_or(&self.path)
    }

    pub fn set_export_dir(&mut self, dir: impl Into<PathBuf>) {
        self.export_dir = Some(dir.into());
    }

    /// Where exported scenes keep their textures.
    pub fn export_textures_dir(&self) -> PathBuf {
        self.export_dir().join(TEXTURES_DIR)
    }

    /// Where baked textures go: the override if set, else `BakedTextures`.
    pub fn texture_output_dir(&self) -> PathBuf {
        self.texture_output_override
            .clone()
            .unwrap_or_else(|| self.baked_textures_dir())
    }

    pub fn set_texture_output_override(&mut self, dir: Option<PathBuf>) {
        self.texture_output_override = dir;
    }

    /// Keep the directory on disk after drop and return its path.
    pub fn persist(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for WorkDirectory {
    fn drop(&mut self) {
        if self.keep || !self.path.exists() {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed work directory {:?}", self.path),
            Err(e) => warn!("Failed to remove work directory {:?}: {}", self.path, e),
        }
    }
}
