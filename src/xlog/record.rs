//! Redo record framing
//!
//! Each record in a log or snapshot file is framed as:
//!
//! ```text
//! offset  size  field
//!      0     4  row marker, 0xBA0BABED (LE)
//!      4     4  header crc32c
//!      8     8  lsn (i64 LE)
//!     16     8  tm  (f64 LE, seconds)
//!     24     4  len (u32 LE)
//!     28     4  data crc32c
//!     32   len  body
//! ```
//!
//! The header checksum covers bytes 8..32 (lsn through data crc32c);
//! the data checksum covers the `len` body bytes. The body itself leads
//! with the operation tag (u16 LE) and the caller cookie (u64 LE),
//! followed by the operation payload; `len` covers all three.
//!
//! A sealed file ends with the EOF marker 0x10ADAB1E.

use super::checksum::{compute_checksum, verify_checksum};

/// Marker preceding every record.
pub const ROW_MARKER: u32 = 0xBA0B_ABED;

/// Marker sealing a cleanly closed file.
pub const EOF_MARKER: u32 = 0x10AD_AB1E;

/// Size of the marker, in bytes.
pub const MARKER_LEN: usize = 4;

/// Size of the frame header after the marker: header crc + lsn + tm +
/// len + data crc.
pub const FRAME_HEADER_LEN: usize = 28;

/// Bytes of the body taken by the operation tag and cookie.
pub const BODY_PREFIX_LEN: usize = 10;

/// A decoded redo record.
///
/// `lsn == 0` and `tm == 0.0` mean "not yet assigned"; the appender
/// stamps both at append time.
#[derive(Debug, Clone, PartialEq)]
pub struct RedoRow {
    /// Log sequence number, monotonic in append order
    pub lsn: i64,
    /// Wall-clock timestamp, seconds
    pub tm: f64,
    /// Operation tag
    pub op_type: u16,
    /// Opaque caller tag carried through the log
    pub cookie: u64,
    /// Operation payload (tag and cookie excluded)
    pub body: Vec<u8>,
}

impl RedoRow {
    /// Builds a row awaiting LSN and timestamp assignment.
    pub fn new(op_type: u16, cookie: u64, body: Vec<u8>) -> Self {
        Self {
            lsn: 0,
            tm: 0.0,
            op_type,
            cookie,
            body,
        }
    }

    /// Total on-disk length of the framed record.
    pub fn frame_len(&self) -> usize {
        MARKER_LEN + FRAME_HEADER_LEN + BODY_PREFIX_LEN + self.body.len()
    }

    /// Appends the framed record (marker, header, body) to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let len = (BODY_PREFIX_LEN + self.body.len()) as u32;

        let mut data = Vec::with_capacity(len as usize);
        data.extend_from_slice(&self.op_type.to_le_bytes());
        data.extend_from_slice(&self.cookie.to_le_bytes());
        data.extend_from_slice(&self.body);
        let data_crc = compute_checksum(&data);

        let mut header = [0u8; 24];
        header[0..8].copy_from_slice(&self.lsn.to_le_bytes());
        header[8..16].copy_from_slice(&self.tm.to_le_bytes());
        header[16..20].copy_from_slice(&len.to_le_bytes());
        header[20..24].copy_from_slice(&data_crc.to_le_bytes());
        let header_crc = compute_checksum(&header);

        out.reserve(self.frame_len());
        out.extend_from_slice(&ROW_MARKER.to_le_bytes());
        out.extend_from_slice(&header_crc.to_le_bytes());
        out.extend_from_slice(&header);
        out.extend_from_slice(&data);
    }

    /// Assembles a row from a validated frame header and body bytes.
    ///
    /// The body must already have passed data-checksum verification.
    pub(crate) fn from_frame(header: &FrameHeader, data: &[u8]) -> Result<Self, String> {
        if data.len() < BODY_PREFIX_LEN {
            return Err(format!(
                "body of {} bytes is too short for tag and cookie",
                data.len()
            ));
        }
        let op_type = u16::from_le_bytes([data[0], data[1]]);
        let cookie = u64::from_le_bytes([
            data[2], data[3], data[4], data[5], data[6], data[7], data[8], data[9],
        ]);
        Ok(Self {
            lsn: header.lsn,
            tm: header.tm,
            op_type,
            cookie,
            body: data[BODY_PREFIX_LEN..].to_vec(),
        })
    }
}

/// Fixed header fields of one frame, decoded after the marker.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    pub lsn: i64,
    pub tm: f64,
    pub len: u32,
    pub data_crc: u32,
}

impl FrameHeader {
    /// Decodes the 28 bytes following the row marker, verifying the
    /// header checksum.
    pub fn decode(bytes: &[u8; FRAME_HEADER_LEN]) -> Result<Self, String> {
        let stored_crc = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if !verify_checksum(&bytes[4..], stored_crc) {
            return Err("header checksum mismatch".to_string());
        }
        let lsn = i64::from_le_bytes([
            bytes[4], bytes[5], bytes[6], bytes[7], bytes[8], bytes[9], bytes[10], bytes[11],
        ]);
        let tm = f64::from_le_bytes([
            bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18], bytes[19],
        ]);
        let len = u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        let data_crc = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
        Ok(Self {
            lsn,
            tm,
            len,
            data_crc,
        })
    }

    /// Verifies the body bytes against the data checksum.
    pub fn verify_body(&self, data: &[u8]) -> bool {
        verify_checksum(data, self.data_crc)
    }
}
