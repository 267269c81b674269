//! Pipeline definition files.
//!
//! A pipeline file is a JSON document holding one pipeline tree:
//!
//! ```json
//! {
//!   "version": 1,
//!   "saved_at": "2024-05-01T12:00:00Z",
//!   "pipeline": {
//!     "class": "IReductionPipeline",
//!     "settings": { "Pipeline/IntermediateStep": { "type": "Bool", "value": false } },
//!     "material_casters": [ { "class": "IColorCaster", "settings": {} } ],
//!     "cascaded_pipelines": []
//!   }
//! }
//! ```
//!
//! Settings are merged over the kind's defaults on load, so files only
//! need to carry the values they change. Every stored path and type is
//! validated against the kind's schema.

use super::config::{MaterialCaster, PipelineConfig};
use super::kind::{MaterialCasterKind, PipelineKind};
use super::schema;
use crate::error::{Result, SgError};
use crate::settings::SettingsTree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current pipeline file format version
pub const PIPELINE_FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PipelineDocument {
    version: u32,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    pipeline: PipelineNode,
}

#[derive(Debug, Serialize, Deserialize)]
struct PipelineNode {
    class: String,
    #[serde(default)]
    settings: SettingsTree,
    #[serde(default)]
    material_casters: Vec<CasterNode>,
    #[serde(default)]
    cascaded_pipelines: Vec<PipelineNode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CasterNode {
    class: String,
    #[serde(default)]
    settings: SettingsTree,
}

/// Reads and writes pipeline definition files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineSerializer;

impl PipelineSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Write a pipeline tree to `path`, creating parent directories.
    pub fn save(&self, pipeline: &PipelineConfig, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_json(pipeline)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SgError::IoFailure(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }

        std::fs::write(path, content).map_err(|e| {
            SgError::IoFailure(format!("Failed to write pipeline file {:?}: {}", path, e))
        })
    }

    /// Read a pipeline tree from `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<PipelineConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SgError::IoFailure(format!("Failed to read pipeline file {:?}: {}", path, e))
        })?;

        self.from_json(&content).map_err(|e| match e {
            SgError::InvalidConfiguration(detail) => SgError::InvalidConfiguration(format!(
                "Invalid pipeline definition file - {}: {}",
                path.display(),
                detail
            )),
            other => other,
        })
    }

    pub fn to_json(&self, pipeline: &PipelineConfig) -> Result<String> {
        let document = PipelineDocument {
            version: PIPELINE_FILE_VERSION,
            saved_at: Some(Utc::now()),
            pipeline: to_node(pipeline),
        };

        serde_json::to_string_pretty(&document)
            .map_err(|e| SgError::Serialization(format!("Failed to serialize pipeline: {}", e)))
    }

    pub fn from_json(&self, content: &str) -> Result<PipelineConfig> {
        let document: PipelineDocument = serde_json::from_str(content)
            .map_err(|e| SgError::InvalidConfiguration(format!("malformed document: {}", e)))?;

        if document.version > PIPELINE_FILE_VERSION {
            return Err(SgError::InvalidConfiguration(format!(
                "unsupported version {} (newest supported is {})",
                document.version, PIPELINE_FILE_VERSION
            )));
        }

        from_node(document.pipeline)
    }
}

fn to_node(pipeline: &PipelineConfig) -> PipelineNode {
    PipelineNode {
        class: pipeline.class_name(),
        settings: pipeline.settings().clone(),
        material_casters: pipeline
            .material_casters()
            .iter()
            .map(|caster| CasterNode {
                class: caster.class_name(),
                settings: caster.settings().clone(),
            })
            .collect(),
        cascaded_pipelines: pipeline
            .cascaded_pipelines()
            .iter()
            .map(|child| to_node(&child.borrow()))
            .collect(),
    }
}

fn from_node(node: PipelineNode) -> Result<PipelineConfig> {
    let kind = PipelineKind::from_class_name(&node.class).ok_or_else(|| {
        SgError::InvalidConfiguration(format!("unknown pipeline class '{}'", node.class))
    })?;

    let settings = merge_settings(schema::pipeline_defaults(kind), &node.settings)?;
    let mut pipeline = PipelineConfig::from_parts(kind, settings);

    for caster in node.material_casters {
        let caster_kind = MaterialCasterKind::from_class_name(&caster.class).ok_or_else(|| {
            SgError::InvalidConfiguration(format!("unknown material caster class '{}'", caster.class))
        })?;
        let settings = merge_settings(schema::caster_defaults(caster_kind), &caster.settings)?;
        pipeline.add_material_caster(MaterialCaster::from_parts(caster_kind, settings));
    }

    let children = node
        .cascaded_pipelines
        .into_iter()
        .map(|child| from_node(child).map(PipelineConfig::into_shared))
        .collect::<Result<Vec<_>>>()?;
    for child in children {
        pipeline.push_cascaded_unchecked(child);
    }

    Ok(pipeline)
}

fn merge_settings(mut defaults: SettingsTree, stored: &SettingsTree) -> Result<SettingsTree> {
    for (path, value) in stored.iter() {
        defaults
            .set(path, value.clone(), true)
            .map_err(|e| SgError::InvalidConfiguration(e.to_string()))?;
    }
    Ok(defaults)
}
