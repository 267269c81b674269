//! Pipeline configurations and the handle-based registry.
//!
//! A pipeline describes one optimization pass (reduction, aggregation,
//! remeshing, impostor generation, ...) through typed settings, an ordered
//! list of material casters and an ordered list of cascaded child
//! pipelines. Children consume their parent's output, which is how LOD
//! chains are expressed.
//!
//! # Architecture
//!
//! ```text
//! PipelineRegistry ── handle ──► SharedPipeline (Rc<RefCell<PipelineConfig>>)
//!                                   ├── SettingsTree (schema by PipelineKind)
//!                                   ├── MaterialCaster[] (SettingsTree each)
//!                                   └── SharedPipeline[] (cascade)
//! ```
//!
//! # Design
//!
//! - **Shared ownership**: a child may be referenced by several parents and
//!   registry handles; it lives until the last reference goes away.
//! - **Schema by kind**: each `PipelineKind` fixes the valid setting paths
//!   and their types (see [`schema`]).
//! - **Acyclic**: cascading a pipeline under one of its own descendants is
//!   rejected.

pub mod config;
pub mod id;
pub mod kind;
pub mod observer;
pub mod registry;
pub mod schema;
pub mod serializer;

pub use config::{add_cascaded, preorder, MaterialCaster, PipelineConfig, SharedPipeline};
pub use id::{ObserverId, PipelineHandle};
pub use kind::{MaterialCasterKind, PipelineKind};
pub use observer::{LogProgressObserver, ProgressObserver};
pub use registry::PipelineRegistry;
pub use serializer::{PipelineSerializer, PIPELINE_FILE_VERSION};
