//! Unified error type for the storage engine.
//!
//! Every fallible engine operation returns `Result<T, OxidbError>`. Narrower
//! error enums defined deeper in the tree (e.g. the B-tree and B-link tree
//! modules' own internal error types) convert losslessly into this one at
//! their module boundary instead of leaking their representation upward.

use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum OxidbError {
    /// Underlying OS I/O failure (short read/write, file-system error, ...).
    #[error("I/O error: {0}")]
    Io(String),

    /// A value could not be encoded for persistence.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Persisted bytes could not be decoded back into a value.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Transaction lifecycle error (double commit, commit-after-abort, ...).
    #[error("transaction error: {0}")]
    TransactionError(String),
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    /// Lock wait exceeded the configured timeout.
    #[error("lock wait timed out: {0}")]
    LockTimeout(String),
    /// Explicit alias of `LockTimeout` for call sites that distinguish a
    /// bounded wait timing out from an unconditional `NOWAIT` request.
    #[error("lock wait timed out: {0}")]
    LockWaitTimeout(String),
    /// A `NOWAIT` lock request could not be granted immediately.
    #[error("lock would block (NOWAIT): {0}")]
    LockWouldBlock(String),
    /// The deadlock detector broke a waits-for cycle by aborting this transaction.
    #[error("deadlock detected: {0}")]
    DeadlockDetected(String),
    /// General lock-manager failure not covered by the variants above.
    #[error("lock error: {0}")]
    Lock(String),

    /// Page manager / buffer pool / disk manager failure.
    #[error("storage error: {0}")]
    Storage(String),
    /// Buffer pool specific failure (no evictable frame, pin underflow, ...).
    #[error("buffer pool error: {0}")]
    BufferPool(String),
    /// Index structure failure (B-tree, B-link tree, hash index).
    #[error("index error: {0}")]
    Index(String),
    /// Foreign key or other schema-level constraint violation.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A checksum mismatch or structural invariant violation the doublewrite
    /// buffer could not repair. Fatal: the engine refuses new transactions.
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// An internal invariant was violated (negative free space, a chain
    /// cycle, ...). Fatal: distinct from `Corruption`, which is data-at-rest
    /// damage, this is a logic bug caught by a defensive assertion.
    #[error("internal assertion failed: {0}")]
    InternalAssertion(String),
    /// Catch-all for internal consistency errors raised by code that isn't
    /// ready to assert fatally (used by index glue code, mostly).
    #[error("internal error: {0}")]
    Internal(String),

    /// Malformed caller input (e.g. an empty record, or a TOML config key).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    /// The requested item (page, slot, table, key) does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// An operation was requested in a state that does not support it.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// Configuration parsing/validation failure.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl OxidbError {
    /// Convenience constructor matching call sites that previously built an
    /// `io::Error` by hand before stringifying it.
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

impl From<io::Error> for OxidbError {
    fn from(error: io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for OxidbError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<bincode::Error> for OxidbError {
    fn from(error: bincode::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<std::string::FromUtf8Error> for OxidbError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Self::Deserialization(error.to_string())
    }
}

impl From<TransactionError> for OxidbError {
    fn from(error: TransactionError) -> Self {
        Self::TransactionError(error.to_string())
    }
}

/// Finer-grained transaction-lifecycle error, converted losslessly into
/// `OxidbError::TransactionError` at the transaction coordinator's boundary.
#[derive(Debug, Clone, Error)]
pub enum TransactionError {
    #[error("transaction already committed")]
    AlreadyCommitted,
    #[error("transaction already aborted")]
    AlreadyAborted,
    #[error("transaction not found")]
    NotFound,
    #[error("deadlock detected")]
    Deadlock,
    #[error("lock timeout")]
    LockTimeout,
    #[error("invalid transaction state: {0}")]
    InvalidState(String),
    #[error("transaction error: {0}")]
    Other(String),
}
