//! Error reporting from out-of-process runs.

/// Receives error messages reported by the batch worker.
///
/// When a handler is registered, worker errors are delivered here and the
/// run keeps waiting for the worker to exit. Without one, the first worker
/// error aborts the run.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorHandler {
    fn handle_error(&self, interface_name: &str, method_name: &str, error_code: i32, error_text: &str);
}

/// Handler that forwards worker errors to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle_error(&self, interface_name: &str, method_name: &str, error_code: i32, error_text: &str) {
        tracing::error!(
            interface = interface_name,
            method = method_name,
            code = error_code,
            "Batch worker error: {}",
            error_text
        );
    }
}
