//! Recording observer and error handler for engine tests

use sgpipeline_rs::{ErrorHandler, ProgressObserver};
use std::cell::RefCell;
use std::rc::Rc;

/// Observer that records every progress report
#[derive(Default)]
pub struct RecordingObserver {
    pub reports: RefCell<Vec<f64>>,
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, percent: f64) -> bool {
        self.reports.borrow_mut().push(percent);
        true
    }
}

/// Handler that records every error text
#[derive(Default)]
pub struct RecordingErrorHandler {
    pub errors: RefCell<Vec<String>>,
}

impl ErrorHandler for RecordingErrorHandler {
    fn handle_error(&self, _interface_name: &str, _method_name: &str, _error_code: i32, error_text: &str) {
        self.errors.borrow_mut().push(error_text.to_string());
    }
}

pub fn recording_observer() -> Rc<RecordingObserver> {
    Rc::new(RecordingObserver::default())
}

pub fn recording_error_handler() -> Rc<RecordingErrorHandler> {
    Rc::new(RecordingErrorHandler::default())
}
