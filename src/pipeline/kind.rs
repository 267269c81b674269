//! Pipeline and material caster kinds.

use crate::error::{Result, SgError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every pipeline kind the registry knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineKind {
    Reduction,
    QuadReduction,
    Aggregation,
    Remeshing,
    BillboardCloudVegetation,
    BillboardCloud,
    Flipbook,
    ImpostorFromSingleView,
    Passthrough,
    HighDensityMeshReduction,
    /// Loadable from pipeline files but not creatable by name.
    RemeshingLegacy,
}

impl PipelineKind {
    /// Kinds accepted by `PipelineRegistry::create`.
    pub const CREATABLE: &'static [PipelineKind] = &[
        PipelineKind::Reduction,
        PipelineKind::QuadReduction,
        PipelineKind::Aggregation,
        PipelineKind::Remeshing,
        PipelineKind::BillboardCloudVegetation,
        PipelineKind::BillboardCloud,
        PipelineKind::Flipbook,
        PipelineKind::ImpostorFromSingleView,
        PipelineKind::Passthrough,
        PipelineKind::HighDensityMeshReduction,
    ];

    pub const ALL: &'static [PipelineKind] = &[
        PipelineKind::Reduction,
        PipelineKind::QuadReduction,
        PipelineKind::Aggregation,
        PipelineKind::Remeshing,
        PipelineKind::BillboardCloudVegetation,
        PipelineKind::BillboardCloud,
        PipelineKind::Flipbook,
        PipelineKind::ImpostorFromSingleView,
        PipelineKind::Passthrough,
        PipelineKind::HighDensityMeshReduction,
        PipelineKind::RemeshingLegacy,
    ];

    /// Short name, as accepted by `create` (`"Reduction"`).
    pub fn name(self) -> &'static str {
        match self {
            PipelineKind::Reduction => "Reduction",
            PipelineKind::QuadReduction => "QuadReduction",
            PipelineKind::Aggregation => "Aggregation",
            PipelineKind::Remeshing => "Remeshing",
            PipelineKind::BillboardCloudVegetation => "BillboardCloudVegetation",
            PipelineKind::BillboardCloud => "BillboardCloud",
            PipelineKind::Flipbook => "Flipbook",
            PipelineKind::ImpostorFromSingleView => "ImpostorFromSingleView",
            PipelineKind::Passthrough => "Passthrough",
            PipelineKind::HighDensityMeshReduction => "HighDensityMeshReduction",
            PipelineKind::RemeshingLegacy => "RemeshingLegacy",
        }
    }

    /// Runtime class name (`"IReductionPipeline"`).
    pub fn class_name(self) -> String {
        format!("I{}Pipeline", self.name())
    }

    /// Resolve a kind from its runtime class name.
    pub fn from_class_name(class_name: &str) -> Option<PipelineKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.class_name() == class_name)
    }

    /// Resolve a user-supplied type name for creation.
    ///
    /// The first occurrence of `"Pipeline"` is stripped, so both
    /// `"Reduction"` and `"ReductionPipeline"` resolve. Matching is exact.
    pub fn parse_creatable(type_name: &str) -> Result<PipelineKind> {
        let normalized = strip_first(type_name, "Pipeline");
        Self::CREATABLE
            .iter()
            .copied()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| {
                SgError::NotFound(format!(
                    "The pipeline type is not supported - {}",
                    normalized
                ))
            })
    }

    /// Name of the processor this kind drives, if any.
    pub fn processor_name(self) -> Option<&'static str> {
        match self {
            PipelineKind::Reduction => Some("ReductionProcessor"),
            PipelineKind::QuadReduction => Some("QuadReductionProcessor"),
            PipelineKind::Aggregation => Some("AggregationProcessor"),
            PipelineKind::Remeshing => Some("RemeshingProcessor"),
            PipelineKind::RemeshingLegacy => Some("RemeshingLegacyProcessor"),
            PipelineKind::HighDensityMeshReduction => Some("HighDensityMeshReductionProcessor"),
            PipelineKind::BillboardCloudVegetation
            | PipelineKind::BillboardCloud
            | PipelineKind::Flipbook
            | PipelineKind::ImpostorFromSingleView => Some("ImpostorProcessor"),
            PipelineKind::Passthrough => None,
        }
    }

    /// Path of the mapping-image texture coordinate name for kinds that
    /// bake materials into a new UV set.
    pub fn texcoord_name_path(self) -> Option<String> {
        match self {
            PipelineKind::Reduction
            | PipelineKind::Aggregation
            | PipelineKind::Remeshing
            | PipelineKind::RemeshingLegacy
            | PipelineKind::BillboardCloudVegetation
            | PipelineKind::BillboardCloud
            | PipelineKind::Flipbook
            | PipelineKind::ImpostorFromSingleView => self
                .processor_name()
                .map(|p| format!("{}/MappingImageSettings/TexCoordName", p)),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Material caster kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialCasterKind {
    Color,
    Normal,
    Opacity,
    Displacement,
    AmbientOcclusion,
    GeometryData,
    VertexColor,
}

impl MaterialCasterKind {
    pub const ALL: &'static [MaterialCasterKind] = &[
        MaterialCasterKind::Color,
        MaterialCasterKind::Normal,
        MaterialCasterKind::Opacity,
        MaterialCasterKind::Displacement,
        MaterialCasterKind::AmbientOcclusion,
        MaterialCasterKind::GeometryData,
        MaterialCasterKind::VertexColor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MaterialCasterKind::Color => "Color",
            MaterialCasterKind::Normal => "Normal",
            MaterialCasterKind::Opacity => "Opacity",
            MaterialCasterKind::Displacement => "Displacement",
            MaterialCasterKind::AmbientOcclusion => "AmbientOcclusion",
            MaterialCasterKind::GeometryData => "GeometryData",
            MaterialCasterKind::VertexColor => "VertexColor",
        }
    }

    /// Runtime class name (`"IColorCaster"`).
    pub fn class_name(self) -> String {
        format!("I{}Caster", self.name())
    }

    pub fn from_class_name(class_name: &str) -> Option<MaterialCasterKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.class_name() == class_name)
    }

    /// Resolve a user-supplied caster type name, stripping the first `"Caster"`.
    pub fn parse(type_name: &str) -> Result<MaterialCasterKind> {
        let normalized = strip_first(type_name, "Caster");
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| {
                SgError::NotFound(format!(
                    "The caster type is not supported - {}",
                    normalized
                ))
            })
    }

    /// Material channel a new caster of this kind reads from.
    pub fn default_material_channel(self) -> &'static str {
        match self {
            MaterialCasterKind::Color => "Diffuse",
            MaterialCasterKind::Normal => "Normals",
            MaterialCasterKind::Opacity => "Opacity",
            MaterialCasterKind::Displacement => "Displacement",
            MaterialCasterKind::AmbientOcclusion => "AmbientOcclusion",
            MaterialCasterKind::GeometryData => "GeometryData",
            MaterialCasterKind::VertexColor => "VertexColors",
        }
    }
}

impl fmt::Display for MaterialCasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Remove the first occurrence of `pattern` from `name`.
fn strip_first(name: &str, pattern: &str) -> String {
    name.replacen(pattern, "", 1)
}

/// Drop a single leading `I` from a runtime class name
/// (`"IReductionPipeline"` becomes `"ReductionPipeline"`).
pub fn strip_interface_prefix(class_name: &str) -> &str {
    class_name.strip_prefix('I').unwrap_or(class_name)
}
