//! Streaming record cursor with corruption resync
//!
//! The cursor walks a log or snapshot file record by record. It trusts
//! nothing: every record must begin with the row marker and pass both
//! checksums. On a bad record the cursor slides forward one byte at a
//! time until it finds the next marker, logging how much it skipped.
//!
//! `good_offset` always points at the end of the last successfully
//! decoded record (initially the end of the file header). A partial
//! record at the tail of the file never advances it, so `good_offset`
//! is the durable boundary after a crash.

use std::io::{self, Read, Seek, SeekFrom};

use crate::observability::Logger;

use super::errors::XlogResult;
use super::record::{FrameHeader, RedoRow, EOF_MARKER, FRAME_HEADER_LEN, MARKER_LEN, ROW_MARKER};
use super::Xlog;

/// Outcome of one record-read attempt at a marker position.
enum Attempt {
    /// A valid record and the offset just past its body.
    Row(RedoRow, u64),
    /// The file ended mid-record; the contained offset is where the
    /// read stopped.
    Short(u64),
    /// The record is structurally present but failed validation.
    Corrupt(String),
}

/// Streaming reader over one log or snapshot file.
pub struct Cursor<'a> {
    log: &'a mut Xlog,
    good_offset: u64,
    row_count: u64,
    skipped_bytes: u64,
    eof_read: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn open(log: &'a mut Xlog) -> XlogResult<Self> {
        let good_offset = log.file.stream_position()?;
        Ok(Self {
            log,
            good_offset,
            row_count: 0,
            skipped_bytes: 0,
            eof_read: false,
        })
    }

    /// Offset of the end of the last successfully decoded record.
    pub fn good_offset(&self) -> u64 {
        self.good_offset
    }

    /// Number of records this cursor has decoded.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Total bytes skipped between valid records during resync.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes
    }

    /// Whether the file's EOF seal has been observed.
    pub fn eof_read(&self) -> bool {
        self.eof_read
    }

    /// Reads the next record.
    ///
    /// Returns `Ok(None)` when no further record can be produced: the
    /// sealed EOF marker was found, the file simply ends (still being
    /// written), or the tail is garbage with no further marker. The
    /// distinction is observable through `eof_read` and `good_offset`.
    ///
    /// # Errors
    ///
    /// Only underlying I/O failures are returned as errors; corrupt
    /// records are skipped with a warning.
    pub fn read_next(&mut self) -> XlogResult<Option<RedoRow>> {
        if self.eof_read {
            return Ok(None);
        }

        let file = &mut self.log.file;
        file.seek(SeekFrom::Start(self.good_offset))?;

        let mut window = [0u8; MARKER_LEN];
        let n = read_up_to(file, &mut window)?;
        if n < MARKER_LEN {
            return self.finish_eof(self.good_offset + n as u64);
        }
        let mut magic = u32::from_le_bytes(window);
        let mut window_start = self.good_offset;

        loop {
            // Slide a 4-byte window until it holds the row marker.
            while magic != ROW_MARKER {
                let mut byte = [0u8; 1];
                if read_up_to(&mut self.log.file, &mut byte)? == 0 {
                    Logger::debug(
                        "XLOG_SCAN_EOF",
                        &[("offset", &(window_start + MARKER_LEN as u64).to_string())],
                    );
                    return self.finish_eof(window_start + MARKER_LEN as u64);
                }
                magic = (magic >> 8) | (u32::from(byte[0]) << 24);
                window_start += 1;
            }

            if window_start != self.good_offset {
                Logger::warn(
                    "XLOG_RESYNC",
                    &[
                        ("after_offset", &self.good_offset.to_string()),
                        ("skipped_bytes", &(window_start - self.good_offset).to_string()),
                    ],
                );
            }

            match self.read_frame(window_start)? {
                Attempt::Row(row, end) => {
                    self.skipped_bytes += window_start - self.good_offset;
                    self.good_offset = end;
                    self.row_count += 1;
                    return Ok(Some(row));
                }
                Attempt::Short(pos) => {
                    return self.finish_eof(pos);
                }
                Attempt::Corrupt(reason) => {
                    Logger::warn(
                        "XLOG_ROW_READ_FAILED",
                        &[("offset", &window_start.to_string()), ("reason", &reason)],
                    );
                    // Resume the marker scan one byte past this marker.
                    let file = &mut self.log.file;
                    file.seek(SeekFrom::Start(window_start + 1))?;
                    let n = read_up_to(file, &mut window)?;
                    if n < MARKER_LEN {
                        return self.finish_eof(window_start + 1 + n as u64);
                    }
                    magic = u32::from_le_bytes(window);
                    window_start += 1;
                }
            }
        }
    }

    /// Attempts to decode the frame whose marker sits at `marker_offset`.
    /// The file position must be just past the marker.
    fn read_frame(&mut self, marker_offset: u64) -> XlogResult<Attempt> {
        let file = &mut self.log.file;

        let mut header_bytes = [0u8; FRAME_HEADER_LEN];
        let n = read_up_to(file, &mut header_bytes)?;
        if n < FRAME_HEADER_LEN {
            return Ok(Attempt::Short(marker_offset + (MARKER_LEN + n) as u64));
        }

        let header = match FrameHeader::decode(&header_bytes) {
            Ok(header) => header,
            Err(reason) => return Ok(Attempt::Corrupt(reason)),
        };

        let mut data = vec![0u8; header.len as usize];
        let n = read_up_to(file, &mut data)?;
        if n < data.len() {
            return Ok(Attempt::Short(
                marker_offset + (MARKER_LEN + FRAME_HEADER_LEN + n) as u64,
            ));
        }

        if !header.verify_body(&data) {
            return Ok(Attempt::Corrupt("data checksum mismatch".to_string()));
        }

        match RedoRow::from_frame(&header, &data) {
            Ok(row) => {
                let end =
                    marker_offset + (MARKER_LEN + FRAME_HEADER_LEN) as u64 + u64::from(header.len);
                Ok(Attempt::Row(row, end))
            }
            Err(reason) => Ok(Attempt::Corrupt(reason)),
        }
    }

    /// Disposes of end-of-file: decide between a sealed file, a file
    /// still being written, and a corrupt tail.
    ///
    /// `pos` is the offset where reading stopped. A sealed file is
    /// recognizable because exactly one marker-sized read succeeded
    /// past `good_offset` before the end of the file.
    fn finish_eof(&mut self, pos: u64) -> XlogResult<Option<RedoRow>> {
        if pos == self.good_offset + MARKER_LEN as u64 {
            let file = &mut self.log.file;
            file.seek(SeekFrom::Start(self.good_offset))?;
            let mut marker_bytes = [0u8; MARKER_LEN];
            if read_up_to(file, &mut marker_bytes)? < MARKER_LEN {
                Logger::error(
                    "XLOG_EOF_MARKER_UNREADABLE",
                    &[("offset", &self.good_offset.to_string())],
                );
            } else {
                let magic = u32::from_le_bytes(marker_bytes);
                if magic == EOF_MARKER {
                    self.good_offset += MARKER_LEN as u64;
                    self.eof_read = true;
                } else if magic != ROW_MARKER {
                    Logger::error(
                        "XLOG_EOF_MARKER_CORRUPT",
                        &[
                            ("magic", &format!("{:#010x}", magic)),
                            ("offset", &self.good_offset.to_string()),
                        ],
                    );
                }
                // A row marker at the tail means the file is still
                // being written to; keep quiet and let the caller
                // retry later.
            }
        }
        Ok(None)
    }

    /// Closes the cursor, seeking the file back to `good_offset` so a
    /// later cursor resumes from the last durable record.
    pub fn close(self) -> XlogResult<()> {
        self.log.rows += self.row_count;
        self.log
            .file
            .seek(SeekFrom::Start(self.good_offset))
            .map(|_| ())
            .map_err(Into::into)
    }
}

/// Reads until the buffer is full or the stream ends; returns how many
/// bytes were actually read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
