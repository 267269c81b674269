//! Setting types and tagged setting values.

use super::EnumKind;
use crate::error::{Result, SgError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a setting path.
///
/// `Invalid` is what a lookup reports for a path that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingType {
    Invalid,
    Bool,
    Int,
    UInt,
    Double,
    String,
    Enum(EnumKind),
}

impl SettingType {
    pub fn is_valid(self) -> bool {
        self != SettingType::Invalid
    }

    /// Parse a textual value according to this type.
    ///
    /// Enums accept either a variant name or its integer value.
    pub fn parse_value(self, text: &str) -> Result<SettingValue> {
        let text = text.trim();
        let invalid = || {
            SgError::InvalidConfiguration(format!("Cannot parse '{}' as {}", text, self))
        };

        match self {
            SettingType::Invalid => Err(SgError::UnsupportedType(
                "The type is not supported and/or the setting does not exist.".to_string(),
            )),
            SettingType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Ok(SettingValue::Bool(true)),
                "false" | "0" | "off" => Ok(SettingValue::Bool(false)),
                _ => Err(invalid()),
            },
            SettingType::Int => text.parse().map(SettingValue::Int).map_err(|_| invalid()),
            SettingType::UInt => text.parse().map(SettingValue::UInt).map_err(|_| invalid()),
            SettingType::Double => text
                .parse()
                .map(SettingValue::Double)
                .map_err(|_| invalid()),
            SettingType::String => Ok(SettingValue::String(text.to_string())),
            SettingType::Enum(kind) => {
                let value = match text.parse::<i32>() {
                    Ok(v) => v,
                    Err(_) => kind.variant_value(text).ok_or_else(invalid)?,
                };
                Ok(SettingValue::Enum { kind, value })
            }
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingType::Invalid => write!(f, "Invalid"),
            SettingType::Bool => write!(f, "Bool"),
            SettingType::Int => write!(f, "Int"),
            SettingType::UInt => write!(f, "UInt"),
            SettingType::Double => write!(f, "Double"),
            SettingType::String => write!(f, "String"),
            SettingType::Enum(kind) => write!(f, "Enum({})", kind),
        }
    }
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum SettingValue {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Double(f64),
    String(String),
    Enum { kind: EnumKind, value: i32 },
}

impl SettingValue {
    pub fn setting_type(&self) -> SettingType {
        match self {
            SettingValue::Bool(_) => SettingType::Bool,
            SettingValue::Int(_) => SettingType::Int,
            SettingValue::UInt(_) => SettingType::UInt,
            SettingValue::Double(_) => SettingType::Double,
            SettingValue::String(_) => SettingType::String,
            SettingValue::Enum { kind, .. } => SettingType::Enum(*kind),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            SettingValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u32> {
        match self {
            SettingValue::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            SettingValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Integer value of an enum setting of the given kind.
    pub fn as_enum(&self, expected: EnumKind) -> Option<i32> {
        match self {
            SettingValue::Enum { kind, value } if *kind == expected => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(v) => write!(f, "{}", v),
            SettingValue::Int(v) => write!(f, "{}", v),
            SettingValue::UInt(v) => write!(f, "{}", v),
            SettingValue::Double(v) => write!(f, "{}", v),
            SettingValue::String(v) => f.write_str(v),
            SettingValue::Enum { kind, value } => match kind.variant_name(*value) {
                Some(name) => f.write_str(name),
                None => write!(f, "{}", value),
            },
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        SettingValue::Int(v)
    }
}

impl From<u32> for SettingValue {
    fn from(v: u32) -> Self {
        SettingValue::UInt(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Double(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::String(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::String(v)
    }
}
