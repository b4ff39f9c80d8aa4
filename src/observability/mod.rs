//! Observability for the durability core
//!
//! Structured logging and timing used by the log cursor, the directory
//! scanner, and the transaction commit path.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. Synchronous output, one line per event
//! 4. Deterministic field ordering

mod logger;
mod timer;

pub use logger::{Logger, Severity};
pub use timer::Timer;
