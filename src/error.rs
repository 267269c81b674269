//! Error handling for sgpipeline-rs
//!
//! This module defines the crate error type, the coarse [`ErrorKind`]
//! classification callers match on, and a Result alias used throughout
//! the registry and the batch engine.
//!
//! Public operations wrap collaborator failures with an operation-specific
//! context (`"Failed to add pipeline (Reduction): ..."`) via [`ResultExt`].
//! The kind of a wrapped error is still reachable through [`SgError::kind`].

use crate::settings::SettingType;
use thiserror::Error;

/// Main error type for pipeline registry and processing operations
#[derive(Error, Debug)]
pub enum SgError {
    /// Unknown pipeline handle, child index, setting path, pipeline type
    /// or material caster type
    #[error("{0}")]
    NotFound(String),

    /// Malformed pipeline file, bad parameters or a cascade that would cycle
    #[error("{0}")]
    InvalidConfiguration(String),

    /// Scene or texture file that could not be read, written or moved
    #[error("{0}")]
    IoFailure(String),

    /// External worker failed to launch, reported an error or exited non-zero
    #[error("{0}")]
    ProcessFailure(String),

    /// Typed setting access on a path that has no usable type
    #[error("{0}")]
    UnsupportedType(String),

    /// Setting written with a value of the wrong type
    #[error("Setting '{path}' has type {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: SettingType,
        actual: SettingType,
    },

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SgError>,
    },
}

/// Coarse error classification shared by the registry and the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidConfiguration,
    IoFailure,
    ProcessFailure,
    UnsupportedType,
}

impl SgError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SgError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify the error, looking through any context layers
    pub fn kind(&self) -> ErrorKind {
        match self {
            SgError::NotFound(_) => ErrorKind::NotFound,
            SgError::InvalidConfiguration(_) | SgError::Config(_) => {
                ErrorKind::InvalidConfiguration
            }
            SgError::IoFailure(_) | SgError::Io(_) | SgError::Serialization(_) => {
                ErrorKind::IoFailure
            }
            SgError::ProcessFailure(_) => ErrorKind::ProcessFailure,
            SgError::UnsupportedType(_) | SgError::TypeMismatch { .. } => {
                ErrorKind::UnsupportedType
            }
            SgError::WithContext { source, .. } => source.kind(),
        }
    }

    /// The innermost error, without any context layers
    pub fn root_cause(&self) -> &SgError {
        match self {
            SgError::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type alias for sgpipeline-rs operations
pub type Result<T> = std::result::Result<T, SgError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SgError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SgError::from(e).with_context(f()))
    }
}
