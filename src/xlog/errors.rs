//! Log format error types

use std::io;

use thiserror::Error;

/// Result type for log format operations
pub type XlogResult<T> = Result<T, XlogError>;

/// Errors raised by the log file reader and writer
#[derive(Debug, Error)]
pub enum XlogError {
    /// The file header is truncated, of the wrong kind, or of an
    /// unsupported version.
    #[error("invalid log file header: {0}")]
    InvalidHeader(String),

    /// A record failed checksum or structural validation and the cursor
    /// could not resynchronize past it.
    #[error("corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    /// Underlying read/write failure.
    #[error("log i/o error: {0}")]
    Io(#[from] io::Error),
}

impl XlogError {
    /// Build an invalid-header error
    pub fn invalid_header(reason: impl Into<String>) -> Self {
        XlogError::InvalidHeader(reason.into())
    }

    /// Build a corrupt-record error anchored at a byte offset
    pub fn corrupt_record(offset: u64, reason: impl Into<String>) -> Self {
        XlogError::CorruptRecord {
            offset,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_offset() {
        let err = XlogError::corrupt_record(96, "data checksum mismatch");
        let text = err.to_string();
        assert!(text.contains("96"));
        assert!(text.contains("data checksum mismatch"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        let err: XlogError = io.into();
        assert!(matches!(err, XlogError::Io(_)));
    }
}
