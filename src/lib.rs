//! # sgpipeline-rs: Pipeline Registry and Batch Execution Engine
//!
//! Manages Simplygon-style scene optimization pipelines and runs them, either
//! in the calling process or in a supervised batch worker process.
//!
//! ## Architecture
//!
//! - **Settings**: typed, path-addressed pipeline parameters (`SettingValue`,
//!   `SettingType`, the enumerated kinds) validated against per-kind schemas
//! - **Pipeline**: configuration objects, cascade trees, the file serializer
//!   and the handle-based `PipelineRegistry`
//! - **Processing**: the `ProcessingModule` that overrides per-run parameters,
//!   executes a tree and reconciles output scenes and textures
//! - **Worker**: the batch executable's side of the progress protocol
//!
//! ## Configuration
//!
//! Temporary work directories live under `$SIMPLYGON_10_TEMP`, or the
//! platform local data directory plus `Simplygon`:
//!
//! - **Linux**: `~/.local/share/Simplygon/`
//! - **macOS**: `~/Library/Application Support/Simplygon/`
//! - **Windows**: `%LOCALAPPDATA%\Simplygon\`
//!
//! ## Example
//!
//! ```ignore
//! use sgpipeline_rs::{PipelineRegistry, ProcessingModule, RunMode, Scene};
//!
//! let mut registry = PipelineRegistry::new();
//! let lod1 = registry.create("Reduction")?;
//! let lod2 = registry.create("ReductionPipeline")?;
//! registry.set_setting(lod2, "ReductionProcessor/ReductionSettings/ReductionTargetTriangleRatio", 0.25)?;
//! registry.add_cascaded_pipeline(lod1, lod2)?;
//!
//! let mut engine = ProcessingModule::new();
//! let outputs = engine.run_pipeline_on_file(
//!     "in/car.sb".as_ref(),
//!     "out/car.sb".as_ref(),
//!     &registry.get(lod1)?,
//!     RunMode::InThisProcess,
//! )?;
//! // out/car_LOD1.sb, out/car_LOD2.sb
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod processing;
pub mod scene;
pub mod settings;
pub mod worker;

// Re-export commonly used types
pub use config::{EngineConfig, WorkDirectory};
pub use error::{ErrorKind, Result, ResultExt, SgError};
pub use pipeline::{
    MaterialCasterKind, PipelineConfig, PipelineHandle, PipelineKind, PipelineRegistry,
    PipelineSerializer, ProgressObserver, SharedPipeline,
};
pub use processing::{
    BatchType, ErrorHandler, PipelineExecutor, ProcessedScene, ProcessingModule, RunMode,
};
pub use scene::{Scene, Texture, TextureTable};
pub use settings::{EnumKind, SettingType, SettingValue};
