//! Cold-start replay
//!
//! Rebuilds in-memory state from disk: the newest snapshot first, then
//! every log file whose signature is at or past the snapshot, feeding
//! each decoded row to the caller's apply hook. Per-file reading is
//! the cursor's: corrupt stretches are skipped with a warning and the
//! last file's durable boundary is wherever its good records end.
//!
//! A log file that is not the newest must have been sealed by
//! rotation; an unsealed tail there is corruption, not an in-progress
//! write, and replay stops with an error.

use thiserror::Error;

use crate::xdir::{Xdir, XdirError};
use crate::xlog::{RedoRow, Xlog, XlogError};

/// Result type for recovery
pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Errors raised during cold-start replay
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// A directory could not be scanned or a file could not be opened.
    #[error(transparent)]
    Dir(#[from] XdirError),

    /// A file failed structurally mid-sequence.
    #[error(transparent)]
    Log(#[from] XlogError),

    /// The apply hook rejected a row.
    #[error("replay apply failed at lsn {lsn}: {reason}")]
    Apply { lsn: i64, reason: String },
}

/// Applies replayed rows to storage.
pub trait RowApply {
    /// Applies one decoded row. An error aborts replay.
    fn apply_row(&mut self, row: &RedoRow) -> RecoveryResult<()>;
}

/// Statistics from a completed replay.
#[derive(Debug, Clone, Default)]
pub struct ReplayStats {
    /// Snapshot and log files read.
    pub files: u64,
    /// Rows applied.
    pub rows: u64,
    /// Bytes skipped over corrupt stretches, across all files.
    pub skipped_bytes: u64,
    /// Highest LSN applied from the logs.
    pub last_lsn: i64,
    /// Whether the final log file was sealed.
    pub final_file_sealed: bool,
}

/// Replays the newest snapshot and all subsequent logs into `target`.
///
/// Directory scans run first, so the signature indexes reflect the
/// filesystem at call time. The snapshot's own rows are applied before
/// any log rows; log files with a signature at or past the snapshot's
/// are then applied in ascending signature order.
pub fn recover(
    snap_dir: &mut Xdir,
    wal_dir: &mut Xdir,
    target: &mut dyn RowApply,
) -> RecoveryResult<ReplayStats> {
    snap_dir.scan()?;
    wal_dir.scan()?;

    let mut stats = ReplayStats::default();

    let snap_signature = snap_dir.signatures().last().copied();
    if let Some(signature) = snap_signature {
        let mut snap = snap_dir.open_for_read(signature)?;
        replay_file(&mut snap, target, &mut stats)?;
    }

    let wal_signatures: Vec<i64> = match snap_signature {
        Some(snap_sig) => wal_dir
            .signatures()
            .iter()
            .copied()
            .filter(|&sig| sig >= snap_sig)
            .collect(),
        None => wal_dir.signatures().to_vec(),
    };

    for (index, &signature) in wal_signatures.iter().enumerate() {
        let mut log = wal_dir.open_for_read(signature)?;
        let (sealed, boundary) = replay_file(&mut log, target, &mut stats)?;

        let is_last = index == wal_signatures.len() - 1;
        if is_last {
            stats.final_file_sealed = sealed;
        } else if !sealed {
            // Rotation seals every file it leaves behind.
            return Err(RecoveryError::Log(XlogError::corrupt_record(
                boundary,
                "log file is not the newest yet carries no eof marker",
            )));
        }
    }

    Ok(stats)
}

/// Replays one file; returns whether its EOF seal was seen and the
/// durable boundary offset.
fn replay_file(
    log: &mut Xlog,
    target: &mut dyn RowApply,
    stats: &mut ReplayStats,
) -> RecoveryResult<(bool, u64)> {
    let mut cursor = log.cursor()?;

    let outcome = loop {
        match cursor.read_next() {
            Ok(Some(row)) => {
                if let Err(err) = target.apply_row(&row) {
                    break Err(err);
                }
                stats.rows += 1;
                if row.lsn > stats.last_lsn {
                    stats.last_lsn = row.lsn;
                }
            }
            Ok(None) => break Ok(()),
            Err(err) => break Err(err.into()),
        }
    };

    stats.files += 1;
    stats.skipped_bytes += cursor.skipped_bytes();
    let sealed = cursor.eof_read();
    let boundary = cursor.good_offset();
    cursor.close()?;

    outcome.map(|()| (sealed, boundary))
}
