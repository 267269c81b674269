//! Configuration module for sgpipeline-rs
//!
//! This module handles engine configuration:
//! - Where staged scenes and pipeline files go (the work directory)
//! - Where baked textures are written
//! - Which batch worker executable runs out-of-process jobs
//! - How often the worker's output is polled
//!
//! # Data Location
//!
//! Temporary work directories are created below the data root:
//! - `$SIMPLYGON_10_TEMP` when it is set and non-empty
//! - otherwise the platform local data directory plus `Simplygon`
//!   (`~/.local/share/Simplygon/` on Linux, `%LOCALAPPDATA%\Simplygon\` on Windows)
//!
//! # Files
//!
//! Engine configuration may be stored as TOML (`.toml`) or JSON (anything else).
//!
//! # Example
//!
//! ```ignore
//! use sgpipeline_rs::config::EngineConfig;
//!
//! let config = EngineConfig::load_or_default("sgpipeline.toml");
//! let module = ProcessingModule::from_config(&config);
//! ```

pub mod work_directory;

pub use work_directory::WorkDirectory;

use crate::error::{Result, SgError};
use crate::processing::RunMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the data root
pub const TEMP_DIR_ENV: &str = "SIMPLYGON_10_TEMP";

/// Directory name below the platform local data directory
pub const APP_DIR_NAME: &str = "Simplygon";

/// File name of the batch worker executable
pub const BATCH_EXECUTABLE_NAME: &str = if cfg!(windows) {
    "sgpipeline-rs.exe"
} else {
    "sgpipeline-rs"
};

/// Default worker poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1;

// ==================== Data Directory ====================

/// Get the data root for temporary work directories
pub fn app_data_dir() -> Option<PathBuf> {
    match std::env::var_os(TEMP_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs_next::data_local_dir().map(|p| p.join(APP_DIR_NAME)),
    }
}

/// Ensure the data root exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir()
        .ok_or_else(|| SgError::Config("Could not determine app data directory".to_string()))?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            SgError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Batch worker shipped next to the running executable
pub fn default_batch_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    // Test and bench harnesses live one level below the binaries.
    let candidates = [dir.join(BATCH_EXECUTABLE_NAME), dir.join("..").join(BATCH_EXECUTABLE_NAME)];
    candidates.into_iter().find(|p| p.is_file())
}

// ==================== Engine Config ====================

/// Batch engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Staging directory; a managed temporary directory when unset
    pub work_directory: Option<PathBuf>,

    /// Root for baked textures (`<dir>/LOD<n>` per cascade node)
    pub texture_output_directory: Option<PathBuf>,

    /// Batch worker executable for out-of-process runs
    pub external_batch_path: Option<PathBuf>,

    /// Sleep between worker polls
    pub poll_interval_ms: u64,

    /// Default run mode for callers that do not choose one
    pub run_mode: RunMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            work_directory: None,
            texture_output_directory: None,
            external_batch_path: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            run_mode: RunMode::InThisProcess,
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    fn is_toml(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false)
    }

    /// Load configuration from a TOML or JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SgError::Config(format!("Failed to read engine config {:?}: {}", path, e))
        })?;

        if Self::is_toml(path) {
            toml::from_str(&content).map_err(|e| {
                SgError::Config(format!("Failed to parse engine config {:?}: {}", path, e))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                SgError::Config(format!("Failed to parse engine config {:?}: {}", path, e))
            })
        }
    }

    /// Load configuration, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load engine config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration in the format implied by the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = if Self::is_toml(path) {
            toml::to_string_pretty(self)
                .map_err(|e| SgError::Config(format!("Failed to serialize engine config: {}", e)))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| SgError::Config(format!("Failed to serialize engine config: {}", e)))?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SgError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, content)
            .map_err(|e| SgError::Config(format!("Failed to write engine config: {}", e)))
    }
}
