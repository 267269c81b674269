//! Output collection and reconciliation.
//!
//! After a run, every non-intermediate node of the cascade tree contributes
//! one output. In memory that is a [`ProcessedScene`]; on disk it is a scene
//! file next to the requested output path plus a texture directory:
//!
//! ```text
//! <dir>/<title><ext>                       single pipeline, no cascade
//! <dir>/Textures/
//!
//! <dir>/<title>_LOD<n><ext>                cascade node with pre-order index n
//! <dir>/Textures/LOD<n>/
//! ```
//!
//! Texture references are rewritten to point at the relocated copies, with
//! `_1`, `_2`, ... appended to the file stem when a name is already taken.

use super::job::ProcessedScene;
use super::overrides::LOD_PREFIX;
use crate::error::{Result, SgError};
use crate::pipeline::{preorder, SharedPipeline};
use crate::scene::Scene;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name for relocated textures
pub const TEXTURES_DIR: &str = "Textures";

// ==================== Naming ====================

/// Output prefix for a tree: `"LOD"` when it has cascaded children, else empty.
pub fn lod_prefix(pipeline: &SharedPipeline) -> &'static str {
    if pipeline.borrow().cascaded_pipeline_count() > 0 {
        LOD_PREFIX
    } else {
        ""
    }
}

fn split_output_path(output: &Path) -> (PathBuf, String, String) {
    let dir = output
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let title = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = output
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (dir, title, ext)
}

/// Scene file for the node with `lod_index` (`<dir>/<title>_<prefix><n><ext>`),
/// or `output` itself when `prefix` is empty.
pub fn node_output_path(output: &Path, prefix: &str, lod_index: usize) -> PathBuf {
    if prefix.is_empty() {
        return output.to_path_buf();
    }
    let (dir, title, ext) = split_output_path(output);
    dir.join(format!("{}_{}{}{}", title, prefix, lod_index, ext))
}

/// Texture directory for the node with `lod_index`.
pub fn node_texture_dir(output: &Path, prefix: &str, lod_index: usize) -> PathBuf {
    let (dir, _, _) = split_output_path(output);
    let textures = dir.join(TEXTURES_DIR);
    if prefix.is_empty() {
        textures
    } else {
        textures.join(format!("{}{}", prefix, lod_index))
    }
}

/// File the batch worker writes for the node with `lod_index`: the root
/// goes to `output`, every other node to `<dir>/<title>_LOD<n><ext>`.
pub fn worker_output_path(output: &Path, lod_index: usize) -> PathBuf {
    if lod_index == 1 {
        output.to_path_buf()
    } else {
        node_output_path(output, LOD_PREFIX, lod_index)
    }
}

// ==================== In-Memory Results ====================

fn null_scene(position: usize) -> SgError {
    let which = if position == 0 { "output" } else { "cascaded output" };
    SgError::InvalidConfiguration(format!(
        "Could not process the given scene, the {} scene is null.",
        which
    ))
}

/// Processed scenes of every non-intermediate node, in pre-order.
pub fn collect_processed_scenes(pipeline: &SharedPipeline) -> Result<Vec<ProcessedScene>> {
    let mut scenes = Vec::new();
    for (position, node) in preorder(pipeline).iter().enumerate() {
        let node = node.borrow();
        if node.is_intermediate_step() {
            continue;
        }
        let scene = node
            .processed_scene()
            .cloned()
            .ok_or_else(|| null_scene(position))?;
        scenes.push(ProcessedScene {
            lod_index: position + 1,
            scene,
        });
    }
    Ok(scenes)
}

// ==================== Worker Files ====================

/// Write every node's processed scene in the worker output layout.
/// Returns the number of files written.
pub fn save_worker_outputs(pipeline: &SharedPipeline, output: &Path) -> Result<usize> {
    let mut written = 0;
    for (position, node) in preorder(pipeline).iter().enumerate() {
        if let Some(scene) = node.borrow().processed_scene() {
            scene.save_to_file(worker_output_path(output, position + 1))?;
            written += 1;
        }
    }
    Ok(written)
}

/// Load the worker's output files back into the tree as processed scenes.
///
/// The root's file must exist. A missing file for any other node leaves
/// that node without a processed scene.
pub fn load_worker_outputs(pipeline: &SharedPipeline, output: &Path) -> Result<()> {
    if !output.is_file() {
        return Err(SgError::IoFailure(format!(
            "Could not find the processed scene file from the given file path - {}",
            output.display()
        )));
    }

    for (position, node) in preorder(pipeline).iter().enumerate() {
        let path = worker_output_path(output, position + 1);
        let scene = if path.is_file() {
            Some(Scene::load_from_file(&path)?)
        } else {
            None
        };
        node.borrow_mut().set_processed_scene(scene);
    }
    Ok(())
}

/// Remove stale worker output files before a new run.
pub fn clear_worker_outputs(pipeline: &SharedPipeline, output: &Path) {
    let count = pipeline.borrow().total_pipeline_count();
    for lod_index in 1..=count {
        let path = worker_output_path(output, lod_index);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove stale output {:?}: {}", path, e);
            }
        }
    }
}

// ==================== Texture Relocation ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Copy,
    /// Move textures that live below one of the relocator's scratch roots;
    /// anything else is copied so that source assets are never taken away.
    Move,
}

/// Relocates scene textures into output directories.
#[derive(Debug)]
pub struct TextureRelocator {
    mode: TransferMode,
    scratch_roots: Vec<PathBuf>,
    moved: HashMap<PathBuf, PathBuf>,
}

impl TextureRelocator {
    pub fn new(mode: TransferMode) -> Self {
        Self {
            mode,
            scratch_roots: Vec::new(),
            moved: HashMap::new(),
        }
    }

    /// Directories whose files may be moved rather than copied.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_roots.push(root.into());
        self
    }

    /// Relocate every texture of `scene` into `target_dir`, rewriting paths
    /// of the textures that were transferred. A failed transfer keeps the
    /// original path. Returns the number of textures relocated.
    pub fn relocate(&mut self, scene: &mut Scene, target_dir: &Path) -> Result<usize> {
        if scene.texture_table.is_empty() {
            return Ok(0);
        }

        std::fs::create_dir_all(target_dir).map_err(|e| {
            SgError::IoFailure(format!(
                "Could not create texture directory {:?}: {}",
                target_dir, e
            ))
        })?;

        let mut relocated = 0;
        for texture in scene.texture_table.iter_mut() {
            if texture.file_path.is_empty() {
                continue;
            }
            let source = PathBuf::from(&texture.file_path);
            let Some(file_name) = source.file_name() else {
                warn!("Texture '{}' has no file name: {:?}", texture.name, source);
                continue;
            };
            if target_dir.join(file_name) == source {
                continue;
            }

            let target = unique_target(target_dir, Path::new(file_name));
            match self.transfer(&source, &target) {
                Ok(()) => {
                    debug!("Texture {:?} -> {:?}", source, target);
                    texture.file_path = target.to_string_lossy().into_owned();
                    relocated += 1;
                }
                Err(e) => {
                    warn!("Could not relocate texture {:?} to {:?}: {}", source, target, e);
                }
            }
        }
        Ok(relocated)
    }

    fn transfer(&mut self, source: &Path, target: &Path) -> std::io::Result<()> {
        // A texture shared by several outputs may already have been moved.
        if let Some(moved_to) = self.moved.get(source).filter(|_| !source.exists()) {
            std::fs::copy(moved_to, target)?;
            return Ok(());
        }

        let movable = self.mode == TransferMode::Move
            && self.scratch_roots.iter().any(|root| source.starts_with(root));

        if !movable {
            std::fs::copy(source, target)?;
            return Ok(());
        }

        if std::fs::rename(source, target).is_err() {
            std::fs::copy(source, target)?;
            std::fs::remove_file(source)?;
        }
        self.moved.insert(source.to_path_buf(), target.to_path_buf());
        Ok(())
    }
}

/// `dir/name`, or `dir/<stem>_<n><ext>` for the first free `n`.
pub fn unique_target(dir: &Path, file_name: &Path) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, ext)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

// ==================== Export ====================

/// Write every non-intermediate node's processed scene next to `output`
/// and relocate its textures. Returns the written scene paths in pre-order.
pub fn export_scenes_to_file(
    pipeline: &SharedPipeline,
    output: &Path,
    relocator: &mut TextureRelocator,
) -> Result<Vec<PathBuf>> {
    let prefix = lod_prefix(pipeline);
    let mut written = Vec::new();

    for (position, node) in preorder(pipeline).iter().enumerate() {
        let lod_index = position + 1;
        if node.borrow().is_intermediate_step() {
            continue;
        }

        let mut scene = node
            .borrow()
            .processed_scene()
            .cloned()
            .ok_or_else(|| null_scene(position))?;

        let target = node_output_path(output, prefix, lod_index);
        relocator.relocate(&mut scene, &node_texture_dir(output, prefix, lod_index))?;
        scene.save_to_file(&target).map_err(|e| {
            SgError::IoFailure(format!("Could not export the given scene. {}", e))
        })?;

        node.borrow_mut().set_processed_scene(Some(scene));
        written.push(target);
    }

    Ok(written)
}
