//! CRC32-Castagnoli checksums for log records
//!
//! Every record carries two checksums: one over the fixed header fields
//! and one over the body bytes. Any mismatch is corruption and feeds the
//! cursor's resync path.

/// Computes a CRC32-Castagnoli checksum over the provided bytes.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Verifies that the computed checksum matches the expected value.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
