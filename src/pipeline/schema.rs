//! Default parameter tables.
//!
//! The defaults of a pipeline kind double as its schema: a path is valid
//! for a pipeline exactly when it appears here, and the default value
//! fixes the path's type.

use super::kind::{MaterialCasterKind, PipelineKind};
use crate::settings::{EnumKind, SettingValue, SettingsTree};

pub const INTERMEDIATE_STEP: &str = "Pipeline/IntermediateStep";
pub const TEXTURE_OUTPUT_PATH: &str = "Pipeline/TextureOutputPath";
pub const BATCH_PATH: &str = "Pipeline/SimplygonBatchPath";
pub const CASCADED_RUN_MODE: &str = "Pipeline/CascadedRunMode";

pub const OPACITY_CHANNEL: &str = "OpacityChannel";
pub const MATERIAL_CHANNEL: &str = "MaterialChannel";

type Entries = Vec<(String, SettingValue)>;

fn enum_value(kind: EnumKind, value: i32) -> SettingValue {
    SettingValue::Enum { kind, value }
}

fn push(entries: &mut Entries, prefix: &str, name: &str, value: SettingValue) {
    entries.push((format!("{}/{}", prefix, name), value));
}

fn common_settings(entries: &mut Entries) {
    push(entries, "Pipeline", "IntermediateStep", SettingValue::Bool(false));
    push(entries, "Pipeline", "TextureOutputPath", SettingValue::from(""));
    push(entries, "Pipeline", "SimplygonBatchPath", SettingValue::from(""));
    push(
        entries,
        "Pipeline",
        "CascadedRunMode",
        enum_value(EnumKind::PipelineRunMode, 0),
    );
    push(entries, "Pipeline", "KeepUnprocessedSceneMeshes", SettingValue::Bool(false));
    push(entries, "Pipeline", "EmbedReferencedTextures", SettingValue::Bool(false));
}

fn mapping_image_settings(entries: &mut Entries, processor: &str) {
    let prefix = format!("{}/MappingImageSettings", processor);
    push(entries, &prefix, "GenerateMappingImage", SettingValue::Bool(false));
    push(entries, &prefix, "GenerateTexCoords", SettingValue::Bool(false));
    push(entries, &prefix, "TexCoordName", SettingValue::from(""));
    push(
        entries,
        &prefix,
        "TexCoordGeneratorType",
        enum_value(EnumKind::TexcoordGeneratorType, 0),
    );
    push(entries, &prefix, "ApplyNewMaterialIds", SettingValue::Bool(false));
    push(entries, &prefix, "MaximumLayers", SettingValue::UInt(3));

    let output = format!("{}/OutputMaterialSettings", prefix);
    push(entries, &output, "TextureWidth", SettingValue::UInt(1024));
    push(entries, &output, "TextureHeight", SettingValue::UInt(1024));
    push(entries, &output, "MultisamplingLevel", SettingValue::UInt(2));
    push(entries, &output, "GutterSpace", SettingValue::UInt(4));

    let charts = format!("{}/ChartAggregatorSettings", prefix);
    push(
        entries,
        &charts,
        "ChartAggregatorMode",
        enum_value(EnumKind::ChartAggregatorMode, 0),
    );
    push(
        entries,
        &charts,
        "SurfaceAreaScale",
        enum_value(EnumKind::SurfaceAreaScale, 0),
    );
}

fn triangle_target_settings(entries: &mut Entries, prefix: &str) {
    push(entries, prefix, "ReductionTargetTriangleRatio", SettingValue::Double(0.5));
    push(entries, prefix, "ReductionTargetTriangleRatioEnabled", SettingValue::Bool(true));
    push(entries, prefix, "ReductionTargetTriangleCount", SettingValue::UInt(0));
    push(entries, prefix, "ReductionTargetTriangleCountEnabled", SettingValue::Bool(false));
    push(entries, prefix, "ReductionTargetOnScreenSize", SettingValue::UInt(300));
    push(entries, prefix, "ReductionTargetOnScreenSizeEnabled", SettingValue::Bool(false));
    push(
        entries,
        prefix,
        "ReductionTargetStopCondition",
        enum_value(EnumKind::StopCondition, 0),
    );
}

fn reduction_settings(entries: &mut Entries) {
    let settings = "ReductionProcessor/ReductionSettings";
    triangle_target_settings(entries, settings);
    push(
        entries,
        settings,
        "ReductionHeuristics",
        enum_value(EnumKind::ReductionHeuristics, 0),
    );
    push(
        entries,
        settings,
        "DataCreationPreferences",
        enum_value(EnumKind::DataCreationPreferences, 1),
    );
    push(entries, settings, "GeometryImportance", SettingValue::Double(1.0));
    push(entries, settings, "MaterialImportance", SettingValue::Double(1.0));
    push(entries, settings, "TextureImportance", SettingValue::Double(1.0));
    push(entries, settings, "KeepSymmetry", SettingValue::Bool(false));
    push(entries, settings, "SymmetryAxis", enum_value(EnumKind::SymmetryAxis, 1));

    let repair = "ReductionProcessor/RepairSettings";
    push(entries, repair, "WeldDist", SettingValue::Double(0.0));
    push(entries, repair, "TJuncDist", SettingValue::Double(0.0));
    push(entries, repair, "UseWelding", SettingValue::Bool(true));

    let normals = "ReductionProcessor/NormalCalculationSettings";
    push(entries, normals, "ReplaceNormals", SettingValue::Bool(false));
    push(entries, normals, "HardEdgeAngle", SettingValue::Double(75.0));

    let visibility = "ReductionProcessor/VisibilitySettings";
    push(entries, visibility, "UseVisibilityWeightsInReducer", SettingValue::Bool(false));
    push(
        entries,
        visibility,
        "ComputeVisibilityMode",
        enum_value(EnumKind::ComputeVisibilityMode, 0),
    );
    push(
        entries,
        visibility,
        "OcclusionMode",
        enum_value(EnumKind::OcclusionMode, 0),
    );

    let weights = "ReductionProcessor/VertexWeightSettings";
    push(entries, weights, "UseVertexWeightsInReducer", SettingValue::Bool(false));
    push(
        entries,
        weights,
        "WeightsFromColorMode",
        enum_value(EnumKind::WeightsFromColorMode, 0),
    );
    push(entries, weights, "WeightsFromColorName", SettingValue::from(""));

    mapping_image_settings(entries, "ReductionProcessor");
}

fn remeshing_settings(entries: &mut Entries, processor: &str, settings_name: &str) {
    let settings = format!("{}/{}", processor, settings_name);
    push(entries, &settings, "OnScreenSize", SettingValue::UInt(300));
    push(
        entries,
        &settings,
        "SurfaceTransferMode",
        enum_value(EnumKind::SurfaceTransferMode, 1),
    );
    push(entries, &settings, "HardEdgeAngle", SettingValue::Double(80.0));
    push(entries, &settings, "MergeDistance", SettingValue::UInt(0));
    if processor == "RemeshingProcessor" {
        push(entries, &settings, "HoleFilling", enum_value(EnumKind::HoleFilling, 2));
        push(entries, &settings, "RemeshingMode", enum_value(EnumKind::RemeshingMode, 0));
    }
    mapping_image_settings(entries, processor);
}

fn impostor_settings(entries: &mut Entries, kind: PipelineKind) {
    let settings = "ImpostorProcessor/ImpostorSettings";
    let impostor_type = match kind {
        PipelineKind::Flipbook => 1,
        PipelineKind::ImpostorFromSingleView => 2,
        _ => 0,
    };
    push(
        entries,
        settings,
        "ImpostorType",
        enum_value(EnumKind::ImpostorType, impostor_type),
    );

    match kind {
        PipelineKind::BillboardCloud | PipelineKind::BillboardCloudVegetation => {
            let billboard = format!("{}/BillboardCloudSettings", settings);
            let mode = if kind == PipelineKind::BillboardCloudVegetation { 0 } else { 1 };
            push(entries, &billboard, "BillboardMode", enum_value(EnumKind::BillboardMode, mode));
            push(entries, &billboard, "BillboardDensity", SettingValue::Double(0.5));
            push(entries, &billboard, "MaxPlaneCount", SettingValue::UInt(10));
            push(entries, &billboard, "GeometricComplexity", SettingValue::Double(0.5));
            push(entries, &billboard, "TwoSided", SettingValue::Bool(false));
        }
        PipelineKind::Flipbook => {
            let flipbook = format!("{}/FlipbookSettings", settings);
            push(entries, &flipbook, "NumberOfViews", SettingValue::UInt(9));
            push(entries, &flipbook, "VerticalAngleInRadians", SettingValue::Double(0.0));
            push(entries, &flipbook, "UseViewDirectionX", SettingValue::Bool(true));
        }
        PipelineKind::ImpostorFromSingleView => {
            let single = format!("{}/ImpostorFromSingleViewSettings", settings);
            push(entries, &single, "UseTightFitting", SettingValue::Bool(false));
            push(entries, &single, "TightFittingDepthOffset", SettingValue::Double(0.0));
            push(entries, &single, "TwoSided", SettingValue::Bool(false));
        }
        _ => {}
    }

    mapping_image_settings(entries, "ImpostorProcessor");
}

/// Default settings for a pipeline kind.
pub fn pipeline_defaults(kind: PipelineKind) -> SettingsTree {
    let mut entries = Entries::new();
    common_settings(&mut entries);

    match kind {
        PipelineKind::Reduction => reduction_settings(&mut entries),
        PipelineKind::QuadReduction => {
            triangle_target_settings(&mut entries, "QuadReductionProcessor/QuadReductionSettings");
            push(
                &mut entries,
                "QuadReductionProcessor/QuadReductionSettings",
                "KeepSymmetry",
                SettingValue::Bool(false),
            );
        }
        PipelineKind::HighDensityMeshReduction => {
            triangle_target_settings(
                &mut entries,
                "HighDensityMeshReductionProcessor/HighDensityMeshReductionSettings",
            );
            push(
                &mut entries,
                "HighDensityMeshReductionProcessor/HighDensityMeshReductionSettings",
                "MaxDeviation",
                SettingValue::Double(0.0),
            );
        }
        PipelineKind::Aggregation => {
            let settings = "AggregationProcessor/AggregationSettings";
            push(&mut entries, settings, "MergeGeometries", SettingValue::Bool(true));
            push(&mut entries, settings, "EnableGeometryCulling", SettingValue::Bool(false));
            push(
                &mut entries,
                settings,
                "SurfaceAreaScale",
                enum_value(EnumKind::SurfaceAreaScale, 0),
            );
            mapping_image_settings(&mut entries, "AggregationProcessor");
        }
        PipelineKind::Remeshing => {
            remeshing_settings(&mut entries, "RemeshingProcessor", "RemeshingSettings")
        }
        PipelineKind::RemeshingLegacy => remeshing_settings(
            &mut entries,
            "RemeshingLegacyProcessor",
            "RemeshingLegacySettings",
        ),
        PipelineKind::BillboardCloudVegetation
        | PipelineKind::BillboardCloud
        | PipelineKind::Flipbook
        | PipelineKind::ImpostorFromSingleView => impostor_settings(&mut entries, kind),
        PipelineKind::Passthrough => {}
    }

    SettingsTree::from_defaults(entries)
}

/// Default settings for a material caster kind.
pub fn caster_defaults(kind: MaterialCasterKind) -> SettingsTree {
    let mut entries: Entries = vec![
        (MATERIAL_CHANNEL.into(), SettingValue::from(kind.default_material_channel())),
        (OPACITY_CHANNEL.into(), SettingValue::from("Opacity")),
        (
            "OpacityChannelComponent".into(),
            enum_value(EnumKind::ColorComponent, 3),
        ),
        ("Dilation".into(), SettingValue::UInt(10)),
        ("FillMode".into(), enum_value(EnumKind::AtlasFillMode, 0)),
        ("DitherType".into(), enum_value(EnumKind::DitherPatterns, 0)),
        ("OutputPixelFormat".into(), enum_value(EnumKind::PixelFormat, 3)),
        ("OutputImageFileFormat".into(), enum_value(EnumKind::ImageOutputFormat, 0)),
        (
            "OutputDDSCompressionType".into(),
            enum_value(EnumKind::DDSCompressionType, 0),
        ),
    ];

    match kind {
        MaterialCasterKind::Color => {
            entries.push(("OutputSRGB".into(), SettingValue::Bool(true)));
        }
        MaterialCasterKind::Normal => {
            entries.push(("GenerateTangentSpaceNormals".into(), SettingValue::Bool(true)));
            entries.push((
                "TangentSpaceMethod".into(),
                enum_value(EnumKind::TangentSpaceMethod, 0),
            ));
            entries.push(("FlipGreen".into(), SettingValue::Bool(false)));
        }
        MaterialCasterKind::Opacity => {
            entries.push(("OutputOpacityType".into(), enum_value(EnumKind::OpacityType, 0)));
        }
        MaterialCasterKind::Displacement => {
            entries.push(("DistanceScaling".into(), SettingValue::Double(1.0)));
        }
        MaterialCasterKind::AmbientOcclusion => {
            entries.push(("OcclusionMode".into(), enum_value(EnumKind::OcclusionMode, 0)));
            entries.push(("RaysPerPixel".into(), SettingValue::UInt(64)));
            entries.push(("OcclusionFalloff".into(), SettingValue::Double(1.0)));
        }
        MaterialCasterKind::GeometryData => {
            entries.push((
                "GeometryDataFieldType".into(),
                enum_value(EnumKind::GeometryDataFieldType, 0),
            ));
            entries.push(("GeometryDataFieldIndex".into(), SettingValue::UInt(0)));
        }
        MaterialCasterKind::VertexColor => {
            entries.push(("ColorSpaceEdgeThreshold".into(), SettingValue::Double(0.0)));
        }
    }

    SettingsTree::from_defaults(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingType;

    #[test]
    fn test_common_settings_on_every_kind() {
        for kind in PipelineKind::ALL {
            let tree = pipeline_defaults(*kind);
            assert_eq!(tree.value_type(INTERMEDIATE_STEP), SettingType::Bool, "{}", kind);
            assert_eq!(tree.value_type(TEXTURE_OUTPUT_PATH), SettingType::String);
            assert_eq!(tree.value_type(BATCH_PATH), SettingType::String);
        }
    }

    #[test]
    fn test_texcoord_path_in_schema() {
        for kind in PipelineKind::ALL {
            if let Some(path) = kind.texcoord_name_path() {
                let tree = pipeline_defaults(*kind);
                assert_eq!(tree.value_type(&path), SettingType::String, "{}", kind);
            }
        }
    }

    #[test]
    fn test_reduction_ratio_default() {
        let tree = pipeline_defaults(PipelineKind::Reduction);
        assert_eq!(
            tree.get("ReductionProcessor/ReductionSettings/ReductionTargetTriangleRatio"),
            Some(&SettingValue::Double(0.5))
        );
    }

    #[test]
    fn test_passthrough_has_only_common_settings() {
        let tree = pipeline_defaults(PipelineKind::Passthrough);
        assert!(tree.iter().all(|(path, _)| path.starts_with("Pipeline/")));
    }

    #[test]
    fn test_caster_defaults() {
        let tree = caster_defaults(MaterialCasterKind::Normal);
        assert_eq!(tree.get(MATERIAL_CHANNEL), Some(&SettingValue::from("Normals")));
        assert_eq!(tree.get(OPACITY_CHANNEL), Some(&SettingValue::from("Opacity")));
        assert_eq!(
            tree.value_type("TangentSpaceMethod"),
            SettingType::Enum(EnumKind::TangentSpaceMethod)
        );
    }
}
