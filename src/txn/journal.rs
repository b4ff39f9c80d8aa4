//! Write-through journal
//!
//! The single writer of the log directory. Commit hands it the redo
//! row; depending on the configured mode the journal appends (and
//! optionally fsyncs) before the commit is allowed to proceed.
//!
//! Log files are named by the LSN of their first row. `rotate` seals
//! the active file; the next write opens a fresh one.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::xdir::Xdir;
use crate::xlog::{Appender, FileKind, RedoRow, XlogError, XlogResult};

/// Whether and how commits reach the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalMode {
    /// Logging disabled; commits are memory-only.
    None,
    /// Append and push to the operating system.
    Write,
    /// Append and force to stable storage before returning.
    Fsync,
}

/// Journal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Log mode for every commit.
    pub mode: WalMode,
    /// Commits whose log write takes longer than this many seconds
    /// are reported with a warning.
    pub too_long_threshold: f64,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            mode: WalMode::Write,
            too_long_threshold: 0.5,
        }
    }
}

/// The single log writer for one database instance.
pub struct Journal {
    config: JournalConfig,
    dir: Option<Xdir>,
    appender: Option<Appender>,
    next_lsn: i64,
}

impl Journal {
    /// Opens a journal over `dir`, creating the directory if needed.
    ///
    /// With mode `None` the directory is still created so a later
    /// reconfiguration can start writing without re-plumbing.
    pub fn open(dir: impl Into<PathBuf>, config: JournalConfig) -> XlogResult<Self> {
        let path = dir.into();
        fs::create_dir_all(&path)?;
        Ok(Self {
            config,
            dir: Some(Xdir::new(path, FileKind::Xlog)),
            appender: None,
            next_lsn: 1,
        })
    }

    /// A journal with logging disabled and no backing directory.
    pub fn disabled() -> Self {
        Self {
            config: JournalConfig {
                mode: WalMode::None,
                too_long_threshold: f64::INFINITY,
            },
            dir: None,
            appender: None,
            next_lsn: 1,
        }
    }

    /// The configured log mode.
    pub fn mode(&self) -> WalMode {
        self.config.mode
    }

    /// Threshold for the slow-commit warning, in seconds.
    pub fn too_long_threshold(&self) -> f64 {
        self.config.too_long_threshold
    }

    /// The LSN the next auto-assigned row will receive.
    pub fn next_lsn(&self) -> i64 {
        self.next_lsn
    }

    /// Positions the LSN counter, typically after recovery replayed
    /// existing logs. Only valid before the first write.
    pub fn set_next_lsn(&mut self, lsn: i64) {
        self.next_lsn = lsn;
    }

    /// Path of the file currently being written, if any.
    pub fn active_path(&self) -> Option<&Path> {
        self.appender.as_ref().map(Appender::path)
    }

    /// Writes one redo row according to the journal mode.
    ///
    /// Returns the LSN the row was assigned, or 0 when logging is
    /// disabled or no row was supplied. The write has reached the
    /// operating system when this returns; mode `Fsync` additionally
    /// forces it to stable storage.
    pub fn write_row(&mut self, row: Option<&mut RedoRow>) -> XlogResult<i64> {
        if self.config.mode == WalMode::None {
            return Ok(0);
        }
        let Some(row) = row else {
            return Ok(0);
        };

        let appender = match self.appender.as_mut() {
            Some(appender) => appender,
            None => {
                let dir = self.dir.as_ref().ok_or_else(|| {
                    XlogError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "journal has no log directory",
                    ))
                })?;
                let path = dir.format_filename(self.next_lsn);
                self.appender
                    .insert(Appender::create(&path, FileKind::Xlog, self.next_lsn)?)
            }
        };

        let lsn = appender.append(row)?;
        self.next_lsn = appender.next_lsn();
        if self.config.mode == WalMode::Fsync {
            appender.sync()?;
        }
        Ok(lsn)
    }

    /// Seals the active log file; the next write starts a new one.
    pub fn rotate(&mut self) -> XlogResult<()> {
        if let Some(appender) = self.appender.take() {
            appender.seal()?;
        }
        Ok(())
    }

    /// Seals the active file and consumes the journal.
    pub fn close(mut self) -> XlogResult<()> {
        self.rotate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_serde_round_trip() {
        let config = JournalConfig {
            mode: WalMode::Fsync,
            too_long_threshold: 0.25,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"fsync\""));
        let back: JournalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mode, WalMode::Fsync);
        assert_eq!(back.too_long_threshold, 0.25);
    }

    #[test]
    fn test_disabled_journal_writes_nothing() {
        let mut journal = Journal::disabled();
        let mut row = RedoRow::new(1, 0, b"payload".to_vec());
        assert_eq!(journal.write_row(Some(&mut row)).unwrap(), 0);
        assert!(journal.active_path().is_none());
    }

    #[test]
    fn test_first_write_names_file_by_lsn() {
        let dir = TempDir::new().unwrap();
        let mut journal = Journal::open(dir.path(), JournalConfig::default()).unwrap();

        let mut row = RedoRow::new(1, 0, b"a".to_vec());
        assert_eq!(journal.write_row(Some(&mut row)).unwrap(), 1);

        let active = journal.active_path().unwrap();
        assert_eq!(
            active.file_name().unwrap().to_str().unwrap(),
            "00000000000000000001.xlog"
        );
    }

    #[test]
    fn test_lsns_are_monotonic_across_rotation() {
        let dir = TempDir::new().unwrap();
        let mut journal = Journal::open(dir.path(), JournalConfig::default()).unwrap();

        let mut first = RedoRow::new(1, 0, b"a".to_vec());
        let mut second = RedoRow::new(1, 0, b"b".to_vec());
        journal.write_row(Some(&mut first)).unwrap();
        journal.rotate().unwrap();
        journal.write_row(Some(&mut second)).unwrap();

        assert_eq!(first.lsn, 1);
        assert_eq!(second.lsn, 2);
        assert_eq!(
            journal.active_path().unwrap().file_name().unwrap().to_str().unwrap(),
            "00000000000000000002.xlog"
        );
    }

    #[test]
    fn test_set_next_lsn_positions_counter() {
        let dir = TempDir::new().unwrap();
        let mut journal = Journal::open(dir.path(), JournalConfig::default()).unwrap();
        journal.set_next_lsn(100);

        let mut row = RedoRow::new(1, 0, b"a".to_vec());
        assert_eq!(journal.write_row(Some(&mut row)).unwrap(), 100);
    }
}
