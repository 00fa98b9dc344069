//! Harness error types

use std::path::PathBuf;
use std::time::Duration;

use epd_core::SuiteError;
use thiserror::Error;

/// Fatal harness errors. Anything here stops the run before or between
/// positions; per-position engine trouble is an `EngineError` instead.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Suite(#[from] SuiteError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed positions file not found: {}", .0.display())]
    FailedIndexNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from a single engine conversation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to spawn engine: {0}")]
    Spawn(String),

    #[error("Engine timed out after {:.1}s", after.as_secs_f64())]
    Timeout {
        after: Duration,
        /// Lines exchanged before the deadline
        partial: Vec<String>,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Engine I/O error: {0}")]
    Io(String),
}
