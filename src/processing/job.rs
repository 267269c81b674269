//! Run modes and per-invocation job state.

use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Where a pipeline run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    /// Through the engine's executor on the calling thread.
    #[default]
    InThisProcess,
    /// In a spawned batch worker process.
    InNewProcess,
}

/// Executor used by the staged batch entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatchType {
    Internal,
    #[default]
    External,
}

impl From<BatchType> for RunMode {
    fn from(batch_type: BatchType) -> Self {
        match batch_type {
            BatchType::Internal => RunMode::InThisProcess,
            BatchType::External => RunMode::InNewProcess,
        }
    }
}

/// One processed scene, tagged with the pre-order LOD index of the
/// cascade node that produced it (root = 1).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedScene {
    pub lod_index: usize,
    pub scene: Scene,
}

/// Lifecycle of a single batch invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Configured,
    ParametersOverridden,
    Running,
    Succeeded,
    Failed,
    OutputsReconciled,
}

impl JobState {
    fn can_advance_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Configured, ParametersOverridden)
                | (ParametersOverridden, Running)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Succeeded, OutputsReconciled)
                | (Configured, Failed)
                | (ParametersOverridden, Failed)
                | (Succeeded, Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Job-local execution context. Never shared between invocations.
#[derive(Debug)]
pub struct BatchJob {
    label: &'static str,
    mode: RunMode,
    state: JobState,
}

impl BatchJob {
    pub fn new(label: &'static str, mode: RunMode) -> Self {
        debug!("{} ({:?}): {}", label, mode, JobState::Configured);
        Self {
            label,
            mode,
            state: JobState::Configured,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn advance(&mut self, next: JobState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid job transition {} -> {}",
            self.state,
            next
        );
        debug!("{} ({:?}): {} -> {}", self.label, self.mode, self.state, next);
        self.state = next;
    }

    /// Record the outcome of a step, moving to `Failed` on error.
    pub fn track<T, E>(&mut self, result: Result<T, E>) -> Result<T, E> {
        if result.is_err() && self.state != JobState::Failed {
            self.advance(JobState::Failed);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut job = BatchJob::new("test", RunMode::InThisProcess);
        job.advance(JobState::ParametersOverridden);
        job.advance(JobState::Running);
        job.advance(JobState::Succeeded);
        job.advance(JobState::OutputsReconciled);
        assert_eq!(job.state(), JobState::OutputsReconciled);
    }

    #[test]
    fn test_track_moves_to_failed() {
        let mut job = BatchJob::new("test", RunMode::InNewProcess);
        job.advance(JobState::ParametersOverridden);
        job.advance(JobState::Running);
        let result: Result<(), &str> = job.track(Err("boom"));
        assert!(result.is_err());
        assert_eq!(job.state(), JobState::Failed);

        let ok: Result<u8, &str> = job.track(Ok(1));
        assert_eq!(ok, Ok(1));
        assert_eq!(job.state(), JobState::Failed);
    }

    #[test]
    #[should_panic(expected = "invalid job transition")]
    #[cfg(debug_assertions)]
    fn test_skipping_states_panics_in_debug() {
        let mut job = BatchJob::new("test", RunMode::InThisProcess);
        job.advance(JobState::Succeeded);
    }

    #[test]
    fn test_batch_type_maps_to_run_mode() {
        assert_eq!(RunMode::from(BatchType::Internal), RunMode::InThisProcess);
        assert_eq!(RunMode::from(BatchType::External), RunMode::InNewProcess);
        assert_eq!(BatchType::default(), BatchType::External);
    }
}
