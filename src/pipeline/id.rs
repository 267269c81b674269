//! Identity types for the pipeline registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque registry handle for a pipeline configuration.
///
/// Handles are issued from a monotonically increasing counter and are never
/// reused while their registry lives (until `clear_all`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineHandle(pub u64);

impl PipelineHandle {
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelineHandle({})", self.0)
    }
}

impl fmt::Display for PipelineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PipelineHandle {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Identifies a progress observer attached to one pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u32);

impl fmt::Debug for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObserverId({})", self.0)
    }
}
