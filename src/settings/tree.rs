//! Path-addressed setting storage with type validation.

use super::{SettingType, SettingValue};
use crate::error::{Result, SgError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalize a setting path: `.` is accepted as a separator and
/// surrounding separators are dropped.
pub fn normalize_path(path: &str) -> String {
    path.trim()
        .replace('.', "/")
        .trim_matches('/')
        .to_string()
}

/// Flat map of setting paths to typed values.
///
/// The first value stored at a path fixes that path's type. Later writes
/// must match it exactly, and enum writes must stay inside the kind's range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsTree {
    entries: BTreeMap<String, SettingValue>,
}

impl SettingsTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from schema defaults.
    pub fn from_defaults<I, P>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (P, SettingValue)>,
        P: AsRef<str>,
    {
        let entries = defaults
            .into_iter()
            .map(|(path, value)| (normalize_path(path.as_ref()), value))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_path(path))
    }

    pub fn value_type(&self, path: &str) -> SettingType {
        self.get(path)
            .map(SettingValue::setting_type)
            .unwrap_or(SettingType::Invalid)
    }

    pub fn get(&self, path: &str) -> Option<&SettingValue> {
        self.entries.get(&normalize_path(path))
    }

    /// Write a value.
    ///
    /// Unknown paths are rejected when `strict` is set and inserted otherwise.
    pub fn set(&mut self, path: &str, value: SettingValue, strict: bool) -> Result<()> {
        let key = normalize_path(path);

        if let SettingValue::Enum { kind, value: raw } = &value {
            if !kind.contains(*raw) {
                return Err(SgError::InvalidConfiguration(format!(
                    "Value {} is out of range for {} (0..{})",
                    raw,
                    kind,
                    kind.variant_count()
                )));
            }
        }

        match self.entries.get_mut(&key) {
            Some(existing) => {
                let expected = existing.setting_type();
                let actual = value.setting_type();
                if expected != actual {
                    return Err(SgError::TypeMismatch {
                        path: key,
                        expected,
                        actual,
                    });
                }
                *existing = value;
                Ok(())
            }
            None if strict => Err(SgError::NotFound(format!(
                "The setting '{}' does not exist.",
                key
            ))),
            None => {
                self.entries.insert(key, value);
                Ok(())
            }
        }
    }

    /// Write a value given as text, parsed according to the path's type.
    pub fn set_from_str(&mut self, path: &str, text: &str, strict: bool) -> Result<()> {
        let value = match self.value_type(path) {
            SettingType::Invalid if !strict => SettingValue::String(text.to_string()),
            ty => ty.parse_value(text)?,
        };
        self.set(path, value, strict)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::settings::EnumKind;

    fn sample_tree() -> SettingsTree {
        SettingsTree::from_defaults([
            ("Pipeline/IntermediateStep", SettingValue::Bool(false)),
            ("Processor/Ratio", SettingValue::Double(0.5)),
            (
                "Processor/StopCondition",
                SettingValue::Enum {
                    kind: EnumKind::StopCondition,
                    value: 0,
                },
            ),
        ])
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/A.B/C/"), "A/B/C");
        assert_eq!(normalize_path(" A/B "), "A/B");
    }

    #[test]
    fn test_dotted_paths_resolve() {
        let tree = sample_tree();
        assert_eq!(tree.value_type("Processor.Ratio"), SettingType::Double);
        assert_eq!(tree.value_type("Missing/Path"), SettingType::Invalid);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut tree = sample_tree();
        let err = tree
            .set("Pipeline/IntermediateStep", SettingValue::Double(1.0), true)
            .unwrap_err();
        assert!(matches!(err, SgError::TypeMismatch { .. }));
        assert_eq!(tree.get("Pipeline/IntermediateStep"), Some(&SettingValue::Bool(false)));
    }

    #[test]
    fn test_enum_range_checked() {
        let mut tree = sample_tree();
        let bad = SettingValue::Enum {
            kind: EnumKind::StopCondition,
            value: 5,
        };
        let err = tree.set("Processor/StopCondition", bad, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_unknown_path_strictness() {
        let mut tree = sample_tree();
        let err = tree.set("Nope", SettingValue::Int(1), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        tree.set("Nope", SettingValue::Int(1), false).unwrap();
        assert_eq!(tree.value_type("Nope"), SettingType::Int);
    }

    #[test]
    fn test_set_from_str_uses_declared_type() {
        let mut tree = sample_tree();
        tree.set_from_str("Processor/Ratio", "0.25", true).unwrap();
        tree.set_from_str("Processor/StopCondition", "Any", true).unwrap();
        assert_eq!(tree.get("Processor/Ratio"), Some(&SettingValue::Double(0.25)));
        assert_eq!(
            tree.get("Processor/StopCondition")
                .and_then(|v| v.as_enum(EnumKind::StopCondition)),
            Some(1)
        );
    }
}
