//! Transaction coordinator
//!
//! One task runs at most one transaction at a time. The coordinator
//! owns the task's transaction slot and drives the single-row commit
//! protocol: replace the tuple in the engine, attach a redo row, write
//! it through the journal, fire triggers, deliver the result.
//!
//! # Invariants enforced
//!
//! - At most one live transaction per task; `begin` fails otherwise.
//! - `space` is set if and only if a tuple mutation has been applied.
//! - When logging is enabled, the redo row is written before commit
//!   triggers fire or the result is delivered.
//! - Every reference acquired by `replace` is released on commit and
//!   rollback alike; the scratch region is released on every terminal
//!   transition.
//! - Rollback reinstates the pre-transaction engine state with a
//!   forced insert.

mod errors;
mod journal;
mod request;
mod scratch;

pub use errors::{TxnError, TxnResult};
pub use journal::{Journal, JournalConfig, WalMode};
pub use request::{
    op_name, RawRequest, ReplayRequest, Request, OP_DELETE, OP_INSERT, OP_REPLACE, OP_UPDATE,
};
pub use scratch::Region;

use std::sync::Arc;

use crate::engine::DupMode;
use crate::observability::{Logger, Timer};
use crate::space::{Space, Trigger};
use crate::tuple::Tuple;
use crate::xlog::RedoRow;

/// Receives the visible tuple of a successful commit.
pub trait ResultSink {
    /// Called exactly once per successful commit that produced a
    /// visible tuple.
    fn add_tuple(&mut self, tuple: &Tuple);
}

/// A sink that collects delivered tuples.
#[derive(Default)]
pub struct TupleCollector {
    tuples: Vec<Tuple>,
}

impl TupleCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tuples delivered so far, in commit order.
    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }
}

impl ResultSink for TupleCollector {
    fn add_tuple(&mut self, tuple: &Tuple) {
        self.tuples.push(tuple.clone());
    }
}

/// A single-row transaction in flight.
pub struct Txn {
    old_tuple: Option<Tuple>,
    new_tuple: Option<Tuple>,
    space: Option<Arc<Space>>,
    row: Option<RedoRow>,
    on_commit: Vec<Trigger>,
    on_rollback: Vec<Trigger>,
}

impl Txn {
    fn new() -> Self {
        Self {
            old_tuple: None,
            new_tuple: None,
            space: None,
            row: None,
            on_commit: Vec::new(),
            on_rollback: Vec::new(),
        }
    }

    /// The tuple displaced by this transaction, if any.
    pub fn old_tuple(&self) -> Option<&Tuple> {
        self.old_tuple.as_ref()
    }

    /// The tuple inserted by this transaction, if any.
    pub fn new_tuple(&self) -> Option<&Tuple> {
        self.new_tuple.as_ref()
    }

    /// The space this transaction has mutated, if any.
    pub fn space(&self) -> Option<&Arc<Space>> {
        self.space.as_ref()
    }

    /// The redo row slated for logging, if attached.
    pub fn row(&self) -> Option<&RedoRow> {
        self.row.as_ref()
    }

    /// Registers a commit trigger; triggers run in insertion order and
    /// must not fail.
    pub fn on_commit(&mut self, trigger: Trigger) {
        self.on_commit.push(trigger);
    }

    /// Registers a rollback trigger; triggers run in insertion order
    /// and must not fail.
    pub fn on_rollback(&mut self, trigger: Trigger) {
        self.on_rollback.push(trigger);
    }
}

/// The per-task transaction slot and scratch region.
///
/// Every coordinator operation takes the context explicitly; there is
/// no process-global transaction state.
pub struct TxnContext {
    current: Option<Txn>,
    region: Region,
}

impl TxnContext {
    /// Creates a context with no transaction in flight.
    pub fn new() -> Self {
        Self {
            current: None,
            region: Region::new(),
        }
    }

    /// The live transaction, if one exists.
    pub fn in_txn(&self) -> Option<&Txn> {
        self.current.as_ref()
    }

    /// Mutable access to the live transaction, for trigger
    /// registration.
    pub fn in_txn_mut(&mut self) -> Option<&mut Txn> {
        self.current.as_mut()
    }

    /// Bytes currently held by the task's scratch region.
    pub fn scratch_used(&self) -> usize {
        self.region.used()
    }

    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Fails with `AlreadyActive` if this task already has one.
    pub fn begin(&mut self) -> TxnResult<()> {
        if self.current.is_some() {
            return Err(TxnError::AlreadyActive);
        }
        self.current = Some(Txn::new());
        Ok(())
    }

    /// Applies a tuple replacement through the space's engine.
    ///
    /// The engine returns the tuple it actually displaced; that tuple
    /// is remembered for rollback. A non-null `new` has a reference
    /// acquired for the lifetime of the transaction. Replace triggers
    /// fire after the swap; they must not mutate the transaction's
    /// tuples.
    ///
    /// # Errors
    ///
    /// Propagates the engine's rejection; the engine restores its
    /// state before raising and the caller should roll back.
    pub fn replace(
        &mut self,
        space: &Arc<Space>,
        old: Option<&Tuple>,
        new: Option<&Tuple>,
        mode: DupMode,
    ) -> TxnResult<()> {
        assert!(
            old.is_some() || new.is_some(),
            "replace requires at least one tuple"
        );
        let txn = self.current.as_mut().ok_or(TxnError::NotActive)?;

        // Remember only the tuple the engine really displaced, so
        // rollback never removes a tuple some other task inserted.
        txn.old_tuple = space.engine().replace(space, old, new, mode)?;
        if let Some(new) = new {
            txn.new_tuple = Some(new.clone());
        }
        txn.space = Some(space.clone());

        if space.run_triggers && !space.replace_triggers().is_empty() {
            let txn: &Txn = txn;
            for trigger in space.replace_triggers() {
                trigger(txn);
            }
        }
        Ok(())
    }

    /// Attaches the redo row for this transaction.
    ///
    /// A pre-built row supplied by the request is used verbatim.
    /// Otherwise, when logging is enabled, a row is synthesized from
    /// the request: operation tag, cookie, and the body encoded into
    /// the task's scratch region. The row's LSN and timestamp stay
    /// unset until append time.
    pub fn add_redo(&mut self, mode: WalMode, request: &dyn Request) -> TxnResult<()> {
        let txn = self.current.as_mut().ok_or(TxnError::NotActive)?;
        txn.row = request.header();
        if mode == WalMode::None || txn.row.is_some() {
            return Ok(());
        }

        let mark = self.region.mark();
        let _segments = request.encode(self.region.writer());
        let body = self.region.since(mark).to_vec();
        txn.row = Some(RedoRow::new(request.op_type(), request.cookie(), body));
        Ok(())
    }

    /// Commits the transaction.
    ///
    /// If a tuple was changed and the space is durable, the redo row
    /// is written through the journal first; only then do commit
    /// triggers fire and the visible tuple reach the sink.
    ///
    /// # Errors
    ///
    /// On a journal failure the transaction stays installed and
    /// `WalIo` is returned; the caller must call `rollback`.
    pub fn commit(
        &mut self,
        journal: &mut Journal,
        sink: &mut dyn ResultSink,
    ) -> TxnResult<()> {
        let mut txn = self.current.take().ok_or(TxnError::NotActive)?;

        let changed = txn.old_tuple.is_some() || txn.new_tuple.is_some();
        let temporary = txn.space.as_ref().is_some_and(|s| s.is_temporary());

        if changed && !temporary {
            // add_redo must have run before commit when logging is on.
            assert!(
                journal.mode() == WalMode::None || txn.row.is_some(),
                "commit without a redo row while logging is enabled"
            );

            let timer = Timer::start();
            let result = journal.write_row(txn.row.as_mut());
            let elapsed = timer.elapsed_seconds();
            if elapsed > journal.too_long_threshold() && txn.row.is_some() {
                let op = txn.row.as_ref().map_or(0, |row| row.op_type);
                Logger::warn(
                    "TXN_COMMIT_TOO_LONG",
                    &[
                        ("op", op_name(op)),
                        ("seconds", &format!("{:.3}", elapsed)),
                    ],
                );
            }
            if let Err(err) = result {
                self.current = Some(txn);
                return Err(TxnError::WalIo(err));
            }
        }

        // Commit triggers must not fail; a panic here aborts.
        for trigger in &txn.on_commit {
            trigger(&txn);
        }

        if let Some(tuple) = txn.new_tuple.as_ref().or(txn.old_tuple.as_ref()) {
            sink.add_tuple(tuple);
        }

        self.finish(txn);
        Ok(())
    }

    /// Rolls the transaction back, restoring the pre-transaction
    /// engine state. A no-op when no transaction is live.
    pub fn rollback(&mut self) {
        let Some(mut txn) = self.current.take() else {
            return;
        };

        if txn.old_tuple.is_some() || txn.new_tuple.is_some() {
            if let Some(space) = txn.space.clone() {
                // Swap the new tuple back out and force the old one in.
                if let Err(err) = space.engine().replace(
                    &space,
                    txn.new_tuple.as_ref(),
                    txn.old_tuple.as_ref(),
                    DupMode::Insert,
                ) {
                    Logger::fatal(
                        "TXN_ROLLBACK_DEFECT",
                        &[
                            ("space", &space.id().to_string()),
                            ("reason", &err.to_string()),
                        ],
                    );
                    panic!("rollback could not reinstate engine state: {}", err);
                }
            }
            for trigger in &txn.on_rollback {
                trigger(&txn);
            }
            txn.new_tuple.take();
        }

        drop(txn);
        self.region.release();
    }

    /// Terminal bookkeeping after a successful commit.
    fn finish(&mut self, mut txn: Txn) {
        txn.old_tuple.take();
        if let Some(space) = txn.space.clone() {
            space.engine().txn_finish(&txn);
        }
        drop(txn);
        self.region.release();
    }
}

impl Default for TxnContext {
    fn default() -> Self {
        Self::new()
    }
}
