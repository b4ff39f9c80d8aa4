//! Log format round-trip and corruption tests
//!
//! The durable boundary contract: every record the appender wrote and
//! the cursor read back is bit-identical; corrupt stretches are
//! skipped, never silently decoded; a partial tail never advances the
//! boundary.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tupledb::xlog::{Appender, FileKind, RedoRow, Xlog, XlogError, EOF_MARKER, ROW_MARKER};

// =============================================================================
// Test Utilities
// =============================================================================

fn log_path(dir: &TempDir) -> PathBuf {
    dir.path().join("00000000000000000001.xlog")
}

/// Appends `bodies` as rows and returns them as stamped by the
/// appender (LSN and timestamp assigned).
fn write_rows(path: &Path, bodies: &[&[u8]], seal: bool) -> Vec<RedoRow> {
    let mut appender = Appender::create(path, FileKind::Xlog, 1).unwrap();
    let mut written = Vec::new();
    for (i, body) in bodies.iter().enumerate() {
        let mut row = RedoRow::new((i + 1) as u16, i as u64 * 7, body.to_vec());
        appender.append(&mut row).unwrap();
        written.push(row);
    }
    if seal {
        appender.seal().unwrap();
    }
    written
}

fn read_all(log: &mut Xlog) -> (Vec<RedoRow>, u64, u64, bool, u64) {
    let mut cursor = log.cursor().unwrap();
    let mut rows = Vec::new();
    while let Some(row) = cursor.read_next().unwrap() {
        rows.push(row);
    }
    let row_count = cursor.row_count();
    let skipped = cursor.skipped_bytes();
    let eof_read = cursor.eof_read();
    let good_offset = cursor.good_offset();
    cursor.close().unwrap();
    (rows, row_count, skipped, eof_read, good_offset)
}

fn append_bytes(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

fn corrupt_bytes(path: &Path, offset: u64, len: usize) {
    use std::io::{Seek, SeekFrom};
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&vec![0x5A; len]).unwrap();
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_round_trip_preserves_every_field() {
    let dir = TempDir::new().unwrap();
    let path = log_path(&dir);
    let written = write_rows(&path, &[b"first", b"second", b"", b"fourth"], true);

    let mut log = Xlog::open(&path, FileKind::Xlog).unwrap();
    let (rows, row_count, skipped, eof_read, _) = read_all(&mut log);

    assert_eq!(row_count, 4);
    assert_eq!(skipped, 0);
    assert!(eof_read);
    for (read, wrote) in rows.iter().zip(written.iter()) {
        assert_eq!(read.lsn, wrote.lsn);
        assert_eq!(read.tm.to_bits(), wrote.tm.to_bits());
        assert_eq!(read.op_type, wrote.op_type);
        assert_eq!(read.cookie, wrote.cookie);
        assert_eq!(read.body, wrote.body);
    }
}

#[test]
fn test_rows_come_back_in_append_order() {
    let dir = TempDir::new().unwrap();
    let path = log_path(&dir);
    let bodies: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i; (i as usize % 5) + 1]).collect();
    let body_refs: Vec<&[u8]> = bodies.iter().map(Vec::as_slice).collect();
    write_rows(&path, &body_refs, true);

    let mut log = Xlog::open(&path, FileKind::Xlog).unwrap();
    let (rows, row_count, _, eof_read, _) = read_all(&mut log);

    assert_eq!(row_count, 20);
    assert!(eof_read);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.lsn, (i + 1) as i64);
        assert_eq!(row.body, bodies[i]);
    }
}

#[test]
fn test_eof_read_false_until_sealed() {
    let dir = TempDir::new().unwrap();
    let path = log_path(&dir);
    write_rows(&path, &[b"only"], false);

    let mut log = Xlog::open(&path, FileKind::Xlog).unwrap();
    let (rows, _, _, eof_read, _) = read_all(&mut log);
    assert_eq!(rows.len(), 1);
    assert!(!eof_read, "unsealed file must not report eof_read");

    append_bytes(&path, &EOF_MARKER.to_le_bytes());
    let mut log = Xlog::open(&path, FileKind::Xlog).unwrap();
    let (_, _, _, eof_read, _) = read_all(&mut log);
    assert!(eof_read, "sealed file must report eof_read");
}

// =============================================================================
// Corruption And Resync
// =============================================================================

#[test]
fn test_resync_skips_corrupt_record_body() {
    let dir = TempDir::new().unwrap();
    let path = log_path(&dir);

    // Write three rows, tracking where the second record starts.
    let mut appender = Appender::create(&path, FileKind::Xlog, 1).unwrap();
    let mut first = RedoRow::new(1, 0, vec![b'a'; 64]);
    appender.append(&mut first).unwrap();
    let second_start = std::fs::metadata(&path).unwrap().len();
    let mut second = RedoRow::new(2, 0, vec![b'b'; 64]);
    appender.append(&mut second).unwrap();
    let mut third = RedoRow::new(3, 0, vec![b'c'; 64]);
    appender.append(&mut third).unwrap();
    appender.seal().unwrap();

    // Smash 17 bytes in the middle of the second record's body.
    corrupt_bytes(&path, second_start + 32 + 20, 17);

    let mut log = Xlog::open(&path, FileKind::Xlog).unwrap();
    let (rows, row_count, skipped, eof_read, _) = read_all(&mut log);

    assert_eq!(row_count, 2);
    assert_eq!(rows[0].op_type, 1);
    assert_eq!(rows[1].op_type, 3);
    assert!(skipped >= 17, "skipped {} bytes, expected at least 17", skipped);
    assert!(eof_read);
}

#[test]
fn test_skipped_bytes_counts_garbage_between_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("00000000000000000001.xlog");

    // Compose the file by hand: header, row, garbage, row.
    let mut contents = b"XLOG\n0.11\n\n".to_vec();
    let mut first = RedoRow::new(1, 0, b"alpha".to_vec());
    first.lsn = 1;
    first.tm = 1.0;
    first.encode_into(&mut contents);
    contents.extend_from_slice(&[0xAA; 13]);
    let mut second = RedoRow::new(2, 0, b"beta".to_vec());
    second.lsn = 2;
    second.tm = 2.0;
    second.encode_into(&mut contents);
    std::fs::write(&path, &contents).unwrap();

    let mut log = Xlog::open(&path, FileKind::Xlog).unwrap();
    let (rows, row_count, skipped, _, _) = read_all(&mut log);

    assert_eq!(row_count, 2);
    assert_eq!(rows[1].lsn, 2);
    assert_eq!(skipped, 13);
}

#[test]
fn test_truncated_tail_stops_at_durable_boundary() {
    let dir = TempDir::new().unwrap();
    let path = log_path(&dir);
    write_rows(&path, &[b"one", b"two"], false);
    let end_of_rows = std::fs::metadata(&path).unwrap().len();

    append_bytes(&path, &[0x42; 12]);

    let mut log = Xlog::open(&path, FileKind::Xlog).unwrap();
    let (rows, row_count, _, eof_read, good_offset) = read_all(&mut log);

    assert_eq!(row_count, 2);
    assert_eq!(rows.len(), 2);
    assert!(!eof_read);
    assert_eq!(good_offset, end_of_rows);
}

#[test]
fn test_row_marker_at_tail_means_still_being_written() {
    let dir = TempDir::new().unwrap();
    let path = log_path(&dir);
    write_rows(&path, &[b"one"], false);
    let end_of_rows = std::fs::metadata(&path).unwrap().len();

    // A bare row marker at the tail is an append in progress.
    append_bytes(&path, &ROW_MARKER.to_le_bytes());

    let mut log = Xlog::open(&path, FileKind::Xlog).unwrap();
    let (rows, _, _, eof_read, good_offset) = read_all(&mut log);

    assert_eq!(rows.len(), 1);
    assert!(!eof_read);
    assert_eq!(good_offset, end_of_rows);
}

// =============================================================================
// Cursor Resumption
// =============================================================================

#[test]
fn test_sequential_cursors_resume_at_boundary() {
    let dir = TempDir::new().unwrap();
    let path = log_path(&dir);
    write_rows(&path, &[b"one", b"two"], true);

    let mut log = Xlog::open(&path, FileKind::Xlog).unwrap();

    let mut cursor = log.cursor().unwrap();
    let first = cursor.read_next().unwrap().unwrap();
    assert_eq!(first.body, b"one");
    cursor.close().unwrap();

    let mut cursor = log.cursor().unwrap();
    let second = cursor.read_next().unwrap().unwrap();
    assert_eq!(second.body, b"two");
    cursor.close().unwrap();

    assert_eq!(log.rows(), 2);
}

// =============================================================================
// Header Validation
// =============================================================================

#[test]
fn test_wrong_filetype_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("00000000000000000001.snap");
    let appender = Appender::create(&path, FileKind::Snap, 1).unwrap();
    appender.seal().unwrap();

    let err = Xlog::open(&path, FileKind::Xlog).unwrap_err();
    assert!(matches!(err, XlogError::InvalidHeader(_)));
}

#[test]
fn test_wrong_version_rejected() {
    let dir = TempDir::new().unwrap();
    let path = log_path(&dir);
    std::fs::write(&path, b"XLOG\n0.12\n\n").unwrap();

    let err = Xlog::open(&path, FileKind::Xlog).unwrap_err();
    assert!(matches!(err, XlogError::InvalidHeader(_)));
}

#[test]
fn test_truncated_header_rejected() {
    let dir = TempDir::new().unwrap();
    let path = log_path(&dir);
    std::fs::write(&path, b"XLOG\n0.11\n").unwrap();

    let err = Xlog::open(&path, FileKind::Xlog).unwrap_err();
    assert!(matches!(err, XlogError::InvalidHeader(_)));
}
