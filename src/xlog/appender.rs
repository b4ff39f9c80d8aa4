//! Framed record writer
//!
//! The appender owns one open log or snapshot file: it writes the
//! three-line header on creation, frames every appended row, and seals
//! the file with the EOF marker on close. It also owns LSN assignment:
//! rows arriving with `lsn == 0` are stamped with the next sequence
//! number, and rows carrying an explicit LSN fast-forward the counter.
//!
//! Every append is pushed to the operating system before the call
//! returns; `sync` additionally forces the data to stable storage.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::errors::XlogResult;
use super::header::{FileHeader, FileKind};
use super::record::{RedoRow, EOF_MARKER};

/// Append-only writer for one log or snapshot file.
pub struct Appender {
    path: PathBuf,
    file: File,
    kind: FileKind,
    next_lsn: i64,
    rows: u64,
}

impl Appender {
    /// Creates a new file at `path` and writes its header.
    ///
    /// The file must not already exist; logs are named by their first
    /// LSN and are never recreated in place.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file exists or cannot be created.
    pub fn create(path: &Path, kind: FileKind, first_lsn: i64) -> XlogResult<Self> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        FileHeader::write(&mut file, kind, &[])?;
        file.flush()?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            kind,
            next_lsn: first_lsn,
            rows: 0,
        })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The kind of file being written.
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// The LSN the next auto-assigned row will receive.
    pub fn next_lsn(&self) -> i64 {
        self.next_lsn
    }

    /// Number of rows appended so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Appends one row, assigning its LSN and timestamp if unset.
    ///
    /// Returns the LSN the row was written under. The write has
    /// reached the operating system when this returns; call `sync`
    /// for on-disk durability.
    pub fn append(&mut self, row: &mut RedoRow) -> XlogResult<i64> {
        if row.lsn == 0 {
            row.lsn = self.next_lsn;
        }
        self.next_lsn = row.lsn + 1;
        if row.tm == 0.0 {
            row.tm = wall_clock_seconds();
        }

        let mut frame = Vec::with_capacity(row.frame_len());
        row.encode_into(&mut frame);
        self.file.write_all(&frame)?;
        self.rows += 1;
        Ok(row.lsn)
    }

    /// Forces all appended rows to stable storage.
    pub fn sync(&self) -> XlogResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Seals the file: writes the EOF marker and syncs.
    ///
    /// Consumes the appender; a sealed file is never appended to again.
    pub fn seal(mut self) -> XlogResult<()> {
        self.file.write_all(&EOF_MARKER.to_le_bytes())?;
        self.file.sync_all()?;
        Ok(())
    }
}

fn wall_clock_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp_micros() as f64 / 1e6
}
