//! Typed pipeline settings.
//!
//! Every pipeline and material caster exposes its parameters as a flat tree
//! of `/`-separated paths (`ReductionProcessor/ReductionSettings/ReductionTargetTriangleRatio`).
//! Each path has exactly one declared [`SettingType`]; reads and writes go
//! through a single generic [`SettingValue`] instead of one accessor per type.

mod enums;
mod tree;
mod value;

pub use enums::EnumKind;
pub use tree::{normalize_path, SettingsTree};
pub use value::{SettingType, SettingValue};
