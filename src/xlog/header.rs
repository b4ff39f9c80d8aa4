//! Log file header
//!
//! Every snapshot and log file starts with a small UTF-8 preamble:
//!
//! ```text
//! XLOG\n          (or SNAP\n)
//! 0.11\n
//! key: value\n    (zero or more free-form lines)
//! \n              (blank line terminates the header)
//! ```
//!
//! The binary record stream begins immediately after the blank line.

use std::io::{BufRead, Write};

use super::errors::{XlogError, XlogResult};

/// On-disk format version accepted by this reader.
pub const FORMAT_VERSION: &str = "0.11";

/// The kind of file a directory holds: snapshots or write-ahead logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Snapshot of full database state
    Snap,
    /// Append-only write-ahead log
    Xlog,
}

impl FileKind {
    /// Filename extension for this kind
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Snap => ".snap",
            FileKind::Xlog => ".xlog",
        }
    }

    /// The filetype line written at the top of the file (without newline)
    pub fn filetype(&self) -> &'static str {
        match self {
            FileKind::Snap => "SNAP",
            FileKind::Xlog => "XLOG",
        }
    }
}

/// Parsed file header
#[derive(Debug, Clone)]
pub struct FileHeader {
    /// The file kind declared on the first line
    pub kind: FileKind,
    /// Free-form metadata lines between the version line and the blank
    /// terminator, kept verbatim without the trailing newline.
    pub meta: Vec<String>,
}

impl FileHeader {
    /// Reads and validates the header from the start of a file.
    ///
    /// The reader is left positioned at the first byte of the record
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHeader` if the filetype does not match
    /// `expected`, the version is not `0.11`, or the header is
    /// truncated before the blank terminator line.
    pub fn read<R: BufRead>(reader: &mut R, expected: FileKind) -> XlogResult<Self> {
        let filetype = read_header_line(reader)?;
        if filetype.trim_end_matches(['\r', '\n']) != expected.filetype() {
            return Err(XlogError::invalid_header(format!(
                "unknown filetype {:?}, expected {:?}",
                filetype.trim_end(),
                expected.filetype()
            )));
        }

        let version = read_header_line(reader)?;
        if version.trim_end_matches(['\r', '\n']) != FORMAT_VERSION {
            return Err(XlogError::invalid_header(format!(
                "unknown version {:?}, expected {:?}",
                version.trim_end(),
                FORMAT_VERSION
            )));
        }

        let mut meta = Vec::new();
        loop {
            let line = read_header_line(reader)?;
            if line == "\n" || line == "\r\n" {
                break;
            }
            meta.push(line.trim_end_matches(['\r', '\n']).to_string());
        }

        Ok(Self {
            kind: expected,
            meta,
        })
    }

    /// Writes a header for a new file of the given kind.
    pub fn write<W: Write>(writer: &mut W, kind: FileKind, meta: &[String]) -> XlogResult<()> {
        writer.write_all(kind.filetype().as_bytes())?;
        writer.write_all(b"\n")?;
        writer.write_all(FORMAT_VERSION.as_bytes())?;
        writer.write_all(b"\n")?;
        for line in meta {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn read_header_line<R: BufRead>(reader: &mut R) -> XlogResult<String> {
    let mut line = String::new();
    let n = reader
        .read_line(&mut line)
        .map_err(|e| XlogError::invalid_header(format!("failed to read header line: {}", e)))?;
    if n == 0 {
        return Err(XlogError::invalid_header(
            "truncated header: end of file before blank terminator",
        ));
    }
    Ok(line)
}
