//! Per-task scratch region
//!
//! A bump buffer for transient allocations made while a transaction is
//! in flight (redo-row synthesis, request encoding). The region is
//! released on every terminal transition; its backing capacity is kept
//! up to a fixed high-water mark so steady-state commits allocate
//! nothing.

/// Capacity retained across releases.
const KEEP_CAPACITY: usize = 128 * 1024;

/// Reusable append-only byte region.
pub struct Region {
    buf: Vec<u8>,
}

impl Region {
    /// Creates an empty region.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Current fill mark; bytes appended after this call start here.
    pub fn mark(&self) -> usize {
        self.buf.len()
    }

    /// The bytes appended since `mark`.
    pub fn since(&self, mark: usize) -> &[u8] {
        &self.buf[mark..]
    }

    /// The underlying buffer, for encoders that append directly.
    pub fn writer(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    /// Bytes currently held.
    pub fn used(&self) -> usize {
        self.buf.len()
    }

    /// Releases everything, clamping retained capacity.
    pub fn release(&mut self) {
        self.buf.clear();
        if self.buf.capacity() > KEEP_CAPACITY {
            self.buf.shrink_to(KEEP_CAPACITY);
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}
