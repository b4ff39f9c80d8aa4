//! Transaction error types

use thiserror::Error;

use crate::engine::EngineError;
use crate::xlog::XlogError;

/// Result type for transaction operations
pub type TxnResult<T> = Result<T, TxnError>;

/// Errors raised by the transaction coordinator
#[derive(Debug, Error)]
pub enum TxnError {
    /// `begin` was called while a transaction is already live on this
    /// task. Caller bug; propagate.
    #[error("transaction already active on this task")]
    AlreadyActive,

    /// An operation other than `begin` was called with no live
    /// transaction. Caller bug; propagate.
    #[error("no active transaction on this task")]
    NotActive,

    /// The log append failed during commit. The engine still holds the
    /// uncommitted change; the caller must roll back.
    #[error("write-ahead log append failed")]
    WalIo(#[source] XlogError),

    /// The engine rejected a replace. The engine restored its state
    /// before raising; the caller should roll back.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
