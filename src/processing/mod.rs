//! Batch execution engine.
//!
//! Runs a pipeline tree against a scene and reconciles its outputs:
//!
//! ```text
//! ┌────────────────────┐   override    ┌──────────────────────┐
//! │  ProcessingModule  │──────────────>│ pipeline tree (LOD n)│
//! └─────────┬──────────┘               └──────────────────────┘
//!           │ run
//!           ├── in this process ──> PipelineExecutor::run_scene
//!           │
//!           └── in a new process ─> ExternalProcess
//!                                    │  stdout/stderr "\r\n" lines
//!                                    ▼
//!                              reader threads ──channel──> progress / errors
//!
//! outputs ──> ProcessedScene list, or <title>_LOD<n><ext> + Textures/LOD<n>/
//! ```
//!
//! - [`module`]: the engine and its public entry points
//! - [`executor`]: the in-process execution seam and the built-in executor
//! - [`overrides`]: per-run texture path, batch path and texcoord overrides
//! - [`process`] and [`protocol`]: batch worker supervision and its line protocol
//! - [`output`]: output naming, collection and texture relocation
//! - [`job`]: run modes and the per-job state machine

pub mod executor;
pub mod handler;
pub mod job;
pub mod module;
pub mod output;
pub mod overrides;
pub mod process;
pub mod protocol;

pub use executor::{LocalExecutor, PipelineExecutor};
pub use handler::{ErrorHandler, LogErrorHandler};
pub use job::{BatchJob, BatchType, JobState, ProcessedScene, RunMode};
pub use module::{ProcessingModule, INPUT_SCENE_FILE, OUTPUT_SCENE_FILE, PIPELINE_FILE};
pub use output::{TextureRelocator, TransferMode};
pub use protocol::{MessageParser, PipeMessage};
