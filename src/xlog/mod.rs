//! Log and snapshot file format
//!
//! The on-disk format shared by snapshots and write-ahead logs: a
//! short UTF-8 header followed by a stream of checksummed binary
//! records, optionally sealed with an EOF marker.
//!
//! # Invariants enforced
//!
//! - Every record begins with the row marker and carries two
//!   CRC32-Castagnoli checksums; both must verify before a record is
//!   surfaced.
//! - A corrupt record never advances the durable boundary: the cursor
//!   resynchronizes on the next marker and reports what it skipped.
//! - A sealed file ends with the EOF marker; an unsealed tail is
//!   "still being written", not corruption.
//! - Appends reach the operating system before the appender returns.

mod appender;
mod checksum;
mod cursor;
mod errors;
mod header;
mod record;

pub use appender::Appender;
pub use checksum::{compute_checksum, verify_checksum};
pub use cursor::Cursor;
pub use errors::{XlogError, XlogResult};
pub use header::{FileHeader, FileKind, FORMAT_VERSION};
pub use record::{RedoRow, EOF_MARKER, ROW_MARKER};

use std::fs::File;
use std::io::{BufReader, Seek};
use std::path::{Path, PathBuf};

/// An open log or snapshot file positioned for reading.
///
/// The header has been read and validated; cursors opened on this
/// handle stream the record section. Closing a cursor seeks back to
/// its durable boundary, so consecutive cursors resume where the
/// previous one stopped.
#[derive(Debug)]
pub struct Xlog {
    pub(crate) path: PathBuf,
    pub(crate) kind: FileKind,
    pub(crate) file: BufReader<File>,
    pub(crate) header: FileHeader,
    pub(crate) rows: u64,
}

impl Xlog {
    /// Opens `path` for reading and validates its header against the
    /// expected file kind.
    pub fn open(path: &Path, expected: FileKind) -> XlogResult<Self> {
        let file = File::open(path)?;
        Self::open_stream(file, path, expected)
    }

    /// Wraps an already-open file, validating the header.
    ///
    /// The file must be positioned at offset zero.
    pub fn open_stream(file: File, path: &Path, expected: FileKind) -> XlogResult<Self> {
        let mut reader = BufReader::new(file);
        let header = FileHeader::read(&mut reader, expected)?;
        Ok(Self {
            path: path.to_path_buf(),
            kind: expected,
            file: reader,
            header,
            rows: 0,
        })
    }

    /// Path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The kind of file (snapshot or log).
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Validated file header.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Rows decoded by cursors that have been closed on this handle.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Current read position in the file.
    pub fn position(&mut self) -> XlogResult<u64> {
        Ok(self.file.stream_position()?)
    }

    /// Opens a cursor at the current read position.
    pub fn cursor(&mut self) -> XlogResult<Cursor<'_>> {
        Cursor::open(self)
    }
}
