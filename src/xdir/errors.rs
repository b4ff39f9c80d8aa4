//! Directory scanner error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::xlog::XlogError;

/// Result type for directory operations
pub type XdirResult<T> = Result<T, XdirError>;

/// Errors raised while scanning or opening log directories
#[derive(Debug, Error)]
pub enum XdirError {
    /// The directory itself could not be read.
    #[error("error reading directory {path}: {source}")]
    ScanFailed { path: PathBuf, source: io::Error },

    /// A file named by signature could not be opened.
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    /// The opened file's header was invalid or unreadable.
    #[error(transparent)]
    Log(#[from] XlogError),
}
