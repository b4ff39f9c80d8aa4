//! tupledb - durability core for an in-memory tuple database
//!
//! Three subsystems, leaves first: the v11 log/snapshot file format
//! (`xlog`), the signature-indexed log directory (`xdir`), and the
//! single-writer transaction coordinator (`txn`). The commit protocol
//! is the writer of the log; the cursor is its reader during recovery.
//!
//! No acknowledged commit exists unless its redo row reached the log.

pub mod engine;
pub mod observability;
pub mod recovery;
pub mod space;
pub mod tuple;
pub mod txn;
pub mod xdir;
pub mod xlog;
