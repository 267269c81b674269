//! Progress observation.

/// Receives progress reports, in percent, while a pipeline runs.
///
/// Observers are attached to a pipeline for the duration of one run and are
/// always called on the thread that started the run.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressObserver {
    /// Report progress in `0.0..=100.0`. Returning `false` asks an
    /// in-process run to stop.
    fn on_progress(&self, percent: f64) -> bool;
}

/// Observer that forwards progress to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressObserver;

impl ProgressObserver for LogProgressObserver {
    fn on_progress(&self, percent: f64) -> bool {
        tracing::info!("Processing: {:.0}%", percent);
        true
    }
}
