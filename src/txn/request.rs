//! Incoming mutation requests
//!
//! A request carries an operation tag, an opaque caller cookie, and
//! either a pre-built redo row or the ability to encode its payload
//! into a body buffer. The coordinator turns a request into the redo
//! record that commit writes to the log.

use crate::xlog::RedoRow;

/// Operation tag: insert a new tuple.
pub const OP_INSERT: u16 = 1;
/// Operation tag: replace an existing tuple.
pub const OP_REPLACE: u16 = 2;
/// Operation tag: update fields of an existing tuple.
pub const OP_UPDATE: u16 = 3;
/// Operation tag: delete a tuple.
pub const OP_DELETE: u16 = 4;

/// Human-readable name of an operation tag, for log events.
pub fn op_name(op_type: u16) -> &'static str {
    match op_type {
        OP_INSERT => "insert",
        OP_REPLACE => "replace",
        OP_UPDATE => "update",
        OP_DELETE => "delete",
        _ => "unknown",
    }
}

/// A mutation to be recorded in the log.
pub trait Request {
    /// Operation tag recorded in the redo row.
    fn op_type(&self) -> u16;

    /// Opaque caller tag carried through the log.
    fn cookie(&self) -> u64 {
        0
    }

    /// A pre-built redo row, if the caller already has one (rows
    /// arriving over replication do). When present the coordinator
    /// uses it verbatim instead of encoding.
    fn header(&self) -> Option<RedoRow> {
        None
    }

    /// Appends the request's body segments to `buf`, returning the
    /// number of segments written.
    fn encode(&self, buf: &mut Vec<u8>) -> usize;
}

/// A request wrapping an already-encoded payload.
///
/// The common case for locally originated mutations: one payload
/// segment, no pre-built row.
pub struct RawRequest {
    op_type: u16,
    cookie: u64,
    payload: Vec<u8>,
}

impl RawRequest {
    /// Builds a request carrying `payload` as its single body segment.
    pub fn new(op_type: u16, payload: Vec<u8>) -> Self {
        Self {
            op_type,
            cookie: 0,
            payload,
        }
    }

    /// Sets the caller cookie.
    pub fn with_cookie(mut self, cookie: u64) -> Self {
        self.cookie = cookie;
        self
    }
}

impl Request for RawRequest {
    fn op_type(&self) -> u16 {
        self.op_type
    }

    fn cookie(&self) -> u64 {
        self.cookie
    }

    fn encode(&self, buf: &mut Vec<u8>) -> usize {
        buf.extend_from_slice(&self.payload);
        1
    }
}

/// A request that replays a row read from another log verbatim.
pub struct ReplayRequest {
    row: RedoRow,
}

impl ReplayRequest {
    /// Wraps a decoded row for re-logging.
    pub fn new(row: RedoRow) -> Self {
        Self { row }
    }
}

impl Request for ReplayRequest {
    fn op_type(&self) -> u16 {
        self.row.op_type
    }

    fn cookie(&self) -> u64 {
        self.row.cookie
    }

    fn header(&self) -> Option<RedoRow> {
        Some(self.row.clone())
    }

    fn encode(&self, buf: &mut Vec<u8>) -> usize {
        buf.extend_from_slice(&self.row.body);
        1
    }
}
