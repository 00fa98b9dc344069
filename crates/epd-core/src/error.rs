//! Suite loading error types

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors while reading a suite or failed-index file.
#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Suite file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SuiteError {
    /// Map an I/O error on `path`, singling out a missing file.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            SuiteError::NotFound { path }
        } else {
            SuiteError::Io { path, source }
        }
    }
}

/// Why a single EPD line was skipped. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineParseError {
    #[error("expected 4 position fields, found {found}")]
    TooFewFields { found: usize },

    #[error("no `bm` best-move annotation")]
    MissingBestMove,
}
