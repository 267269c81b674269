//! Scene documents exchanged with the optimization runtime.
//!
//! The engine never looks inside geometry. It only needs to stage a scene to
//! disk, load it back, and rewrite the file paths held in the scene's
//! texture table. `Scene` is therefore an opaque JSON payload plus a
//! [`TextureTable`].
//!
//! Scene files use the `.sb` extension by convention.

use crate::error::{Result, SgError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional extension for scene files
pub const SCENE_FILE_EXTENSION: &str = "sb";

/// A texture referenced by a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    /// Path of the texture image on disk.
    pub file_path: String,
}

impl Texture {
    pub fn new(name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
        }
    }
}

/// Ordered list of textures referenced by a scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureTable {
    textures: Vec<Texture>,
}

impl TextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, texture: Texture) {
        self.textures.push(texture);
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Texture> {
        self.textures.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Texture> {
        self.textures.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Texture> {
        self.textures.iter_mut()
    }
}

/// An in-memory scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default)]
    pub texture_table: TextureTable,
    /// Geometry and material data, opaque to the engine.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_texture(mut self, name: impl Into<String>, file_path: impl Into<String>) -> Self {
        self.texture_table.add(Texture::new(name, file_path));
        self
    }

    /// Load a scene from a file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SgError::IoFailure(format!("Failed to read scene file {:?}: {}", path, e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            SgError::IoFailure(format!("Failed to parse scene file {:?}: {}", path, e))
        })
    }

    /// Save the scene to a file, creating parent directories as needed.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SgError::IoFailure(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SgError::Serialization(format!("Failed to serialize scene: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            SgError::IoFailure(format!("Failed to write scene file {:?}: {}", path, e))
        })
    }
}
