//! Log and snapshot directory management
//!
//! A directory holds files of exactly one kind, distinguished by
//! extension (`.snap` or `.xlog`). Each file is named by its
//! signature: the decimal LSN of its first record, zero-padded to a
//! fixed width so lexicographic and numeric order agree.
//!
//! Scanning collects the signatures of well-formed names, sorted
//! ascending. Files whose stem does not parse are skipped with a
//! warning; they never fail the scan.

mod errors;

pub use errors::{XdirError, XdirResult};

use std::fs;
use std::path::{Path, PathBuf};

use crate::observability::Logger;
use crate::xlog::{FileKind, Xlog};

/// Width signatures are zero-padded to in filenames.
const SIGNATURE_WIDTH: usize = 20;

/// A directory of snapshot or log files indexed by signature.
pub struct Xdir {
    path: PathBuf,
    kind: FileKind,
    signatures: Vec<i64>,
}

impl Xdir {
    /// Creates a handle for `path`; no filesystem access happens until
    /// `scan` or an open call.
    pub fn new(path: impl Into<PathBuf>, kind: FileKind) -> Self {
        Self {
            path: path.into(),
            kind,
            signatures: Vec::new(),
        }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file kind this directory holds.
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Signatures found by the most recent scan, sorted ascending.
    pub fn signatures(&self) -> &[i64] {
        &self.signatures
    }

    /// Scans the directory, replacing the stored signature index.
    ///
    /// Entries that are not `<decimal i64><extension>` are skipped
    /// with a warning. Signatures equal to `i64::MIN` or `i64::MAX`
    /// are treated as out of range and skipped too.
    ///
    /// # Errors
    ///
    /// Returns `ScanFailed` only when the directory itself cannot be
    /// read.
    pub fn scan(&mut self) -> XdirResult<()> {
        let entries = fs::read_dir(&self.path).map_err(|e| XdirError::ScanFailed {
            path: self.path.clone(),
            source: e,
        })?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| XdirError::ScanFailed {
                path: self.path.clone(),
                source: e,
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(signature) = self.parse_filename(name) {
                found.push(signature);
            }
        }

        found.sort_unstable();
        self.signatures = found;
        Ok(())
    }

    /// Extracts the signature from a directory entry name, or `None`
    /// if the entry does not belong to this directory's kind or does
    /// not parse.
    fn parse_filename(&self, name: &str) -> Option<i64> {
        let dot = name.find('.')?;
        let (stem, ext) = name.split_at(dot);
        if ext != self.kind.extension() {
            return None;
        }
        match stem.parse::<i64>() {
            Ok(signature) if signature != i64::MIN && signature != i64::MAX => Some(signature),
            _ => {
                Logger::warn("XDIR_SKIP_ENTRY", &[("name", name)]);
                None
            }
        }
    }

    /// Full path of the file that holds (or would hold) `signature`.
    ///
    /// Formation and parsing are exact inverses:
    /// `parse(format_filename(s)) == s` for every signature.
    pub fn format_filename(&self, signature: i64) -> PathBuf {
        self.path.join(format!(
            "{:0width$}{}",
            signature,
            self.kind.extension(),
            width = SIGNATURE_WIDTH
        ))
    }

    /// Opens the file named by `signature` for reading, validating its
    /// header against this directory's kind.
    pub fn open_for_read(&self, signature: i64) -> XdirResult<Xlog> {
        let path = self.format_filename(signature);
        let file = fs::File::open(&path).map_err(|e| XdirError::Open {
            path: path.clone(),
            source: e,
        })?;
        Ok(Xlog::open_stream(file, &path, self.kind)?)
    }
}
