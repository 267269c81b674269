//! Enumerated setting kinds and their variant names.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! enum_kinds {
    ($($kind:ident => [$($variant:literal),+ $(,)?]),+ $(,)?) => {
        /// The enumerated types a setting value can carry.
        ///
        /// Values are stored as integers; a value is valid for a kind when it
        /// indexes one of the kind's named variants.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum EnumKind {
            $($kind),+
        }

        impl EnumKind {
            pub const ALL: &'static [EnumKind] = &[$(EnumKind::$kind),+];

            pub fn name(self) -> &'static str {
                match self {
                    $(EnumKind::$kind => stringify!($kind)),+
                }
            }

            /// Variant names, indexed by their integer value.
            pub fn variants(self) -> &'static [&'static str] {
                match self {
                    $(EnumKind::$kind => &[$($variant),+]),+
                }
            }
        }
    };
}

enum_kinds! {
    PipelineRunMode => [
        "RunInThisProcess",
        "RunInNewProcess",
        "RunDistributedUsingSimplygonGrid",
        "RunDistributedUsingIncredibuild",
        "RunDistributedUsingFastbuild",
    ],
    ChartAggregatorMode => ["TextureSizeProportions", "SurfaceArea", "OriginalPixelDensity", "UVSizeProportions"],
    TexcoordGeneratorType => ["Parameterizer", "ChartAggregator"],
    OcclusionMode => ["Standard", "Obscurance", "Occlusion"],
    StopCondition => ["All", "Any"],
    DataCreationPreferences => ["OnlyUseOriginalData", "PreferOriginalData", "PreferOptimizedResult"],
    ReductionHeuristics => ["Fast", "Consistent"],
    WeightsFromColorMode => ["Average", "Luminance", "Channel"],
    SurfaceTransferMode => ["Fast", "Accurate"],
    RemeshingMode => ["Outside", "Inside", "Manual"],
    TangentSpaceMethod => ["OrthonormalRightHanded", "Orthonormal", "OrthonormalLeftHanded"],
    GeometryDataFieldType => [
        "Coords",
        "TexCoords",
        "Normals",
        "Tangents",
        "Bitangents",
        "Colors",
        "TriangleIds",
        "MaterialIds",
        "VertexIds",
        "BarycentricCoords",
    ],
    AtlasFillMode => ["Interpolate", "NearestNeighbor", "NoFill"],
    DitherPatterns => ["NoDither", "FloydSteinberg", "JarvisJudiceNinke", "Sierra"],
    ComputeVisibilityMode => ["DirectX", "Software", "Embree"],
    SurfaceAreaScale => ["LargestInstance", "SmallestInstance", "AverageInstance", "Total"],
    ImpostorType => ["BillboardCloud", "Flipbook", "FromSingleView"],
    SymmetryAxis => ["X", "Y", "Z"],
    PixelFormat => [
        "R8",
        "R8G8",
        "R8G8B8",
        "R8G8B8A8",
        "R16",
        "R16G16",
        "R16G16B16",
        "R16G16B16A16",
    ],
    ColorComponent => ["Red", "Green", "Blue", "Alpha"],
    HoleFilling => ["Disabled", "Low", "Medium", "High", "Extreme"],
    ImageOutputFormat => ["PNG", "JPG", "TIFF", "TGA", "BMP", "DDS"],
    DDSCompressionType => ["NoCompression", "BC1", "BC2", "BC3", "BC4", "BC5"],
    BillboardMode => ["Foliage", "OuterShell"],
    OpacityType => ["Opacity", "Transparency"],
}

impl EnumKind {
    pub fn variant_count(self) -> usize {
        self.variants().len()
    }

    /// Whether `value` names one of this kind's variants.
    pub fn contains(self, value: i32) -> bool {
        value >= 0 && (value as usize) < self.variant_count()
    }

    pub fn variant_name(self, value: i32) -> Option<&'static str> {
        if self.contains(value) {
            Some(self.variants()[value as usize])
        } else {
            None
        }
    }

    /// Look up a variant by name, ignoring ASCII case.
    pub fn variant_value(self, name: &str) -> Option<i32> {
        self.variants()
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
            .map(|i| i as i32)
    }

    pub fn from_name(name: &str) -> Option<EnumKind> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl fmt::Display for EnumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_kinds_listed() {
        assert_eq!(EnumKind::ALL.len(), 25);
        for kind in EnumKind::ALL {
            assert!(kind.variant_count() >= 2, "{} has too few variants", kind);
            assert_eq!(EnumKind::from_name(kind.name()), Some(*kind));
        }
    }

    #[test]
    fn test_range_check() {
        assert!(EnumKind::StopCondition.contains(0));
        assert!(EnumKind::StopCondition.contains(1));
        assert!(!EnumKind::StopCondition.contains(2));
        assert!(!EnumKind::StopCondition.contains(-1));
    }

    #[test]
    fn test_variant_lookup() {
        assert_eq!(EnumKind::HoleFilling.variant_value("medium"), Some(2));
        assert_eq!(EnumKind::HoleFilling.variant_name(4), Some("Extreme"));
        assert_eq!(EnumKind::HoleFilling.variant_value("Huge"), None);
    }
}
