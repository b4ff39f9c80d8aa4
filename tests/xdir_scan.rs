//! Directory scan and signature naming tests

use std::fs;

use tempfile::TempDir;
use tupledb::xdir::{Xdir, XdirError};
use tupledb::xlog::{Appender, FileKind, XlogError};

// =============================================================================
// Scanning
// =============================================================================

#[test]
fn test_scan_ignores_junk_entries() {
    let dir = TempDir::new().unwrap();
    for name in [
        "00000000000000000001.xlog",
        "00000000000000000005.xlog",
        "not-a-log.txt",
        "abc.xlog",
    ] {
        fs::write(dir.path().join(name), b"").unwrap();
    }

    let mut xdir = Xdir::new(dir.path(), FileKind::Xlog);
    xdir.scan().unwrap();
    assert_eq!(xdir.signatures(), &[1, 5]);
}

#[test]
fn test_scan_sorts_signatures_ascending() {
    let dir = TempDir::new().unwrap();
    for sig in [9, 2, 30, 1] {
        fs::write(dir.path().join(format!("{:020}.xlog", sig)), b"").unwrap();
    }

    let mut xdir = Xdir::new(dir.path(), FileKind::Xlog);
    xdir.scan().unwrap();
    assert_eq!(xdir.signatures(), &[1, 2, 9, 30]);
}

#[test]
fn test_scan_keeps_kinds_apart() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("00000000000000000001.xlog"), b"").unwrap();
    fs::write(dir.path().join("00000000000000000002.snap"), b"").unwrap();

    let mut logs = Xdir::new(dir.path(), FileKind::Xlog);
    logs.scan().unwrap();
    assert_eq!(logs.signatures(), &[1]);

    let mut snaps = Xdir::new(dir.path(), FileKind::Snap);
    snaps.scan().unwrap();
    assert_eq!(snaps.signatures(), &[2]);
}

#[test]
fn test_rescan_replaces_index() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("00000000000000000001.xlog"), b"").unwrap();

    let mut xdir = Xdir::new(dir.path(), FileKind::Xlog);
    xdir.scan().unwrap();
    assert_eq!(xdir.signatures(), &[1]);

    fs::write(dir.path().join("00000000000000000003.xlog"), b"").unwrap();
    xdir.scan().unwrap();
    assert_eq!(xdir.signatures(), &[1, 3]);
}

#[test]
fn test_scan_of_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let mut xdir = Xdir::new(dir.path().join("nowhere"), FileKind::Xlog);
    assert!(matches!(xdir.scan(), Err(XdirError::ScanFailed { .. })));
}

#[test]
fn test_scan_of_empty_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    let mut xdir = Xdir::new(dir.path(), FileKind::Xlog);
    xdir.scan().unwrap();
    assert!(xdir.signatures().is_empty());
}

// =============================================================================
// Opening By Signature
// =============================================================================

#[test]
fn test_open_for_read_finds_file_by_signature() {
    let dir = TempDir::new().unwrap();
    let mut xdir = Xdir::new(dir.path(), FileKind::Xlog);

    let appender = Appender::create(&xdir.format_filename(7), FileKind::Xlog, 7).unwrap();
    appender.seal().unwrap();

    xdir.scan().unwrap();
    assert_eq!(xdir.signatures(), &[7]);

    let log = xdir.open_for_read(7).unwrap();
    assert_eq!(log.kind(), FileKind::Xlog);
}

#[test]
fn test_open_for_read_missing_signature_fails() {
    let dir = TempDir::new().unwrap();
    let xdir = Xdir::new(dir.path(), FileKind::Xlog);
    assert!(matches!(
        xdir.open_for_read(9),
        Err(XdirError::Open { .. })
    ));
}

#[test]
fn test_open_for_read_rejects_wrong_header() {
    let dir = TempDir::new().unwrap();
    let xdir = Xdir::new(dir.path(), FileKind::Xlog);

    // A snapshot header hiding under a log extension.
    let appender = Appender::create(&xdir.format_filename(3), FileKind::Snap, 3).unwrap();
    appender.seal().unwrap();

    let err = xdir.open_for_read(3).unwrap_err();
    assert!(matches!(err, XdirError::Log(XlogError::InvalidHeader(_))));
}
