//! Error types for the store module.

use thiserror::Error;

use tibet_core::{CoreError, TokenId};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A token with this id is already stored (append-only violation).
    #[error("duplicate token: {0}")]
    Duplicate(TokenId),

    /// Token not found.
    #[error("token not found: {0}")]
    NotFound(TokenId),

    /// Token could not be encoded or decoded.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A stored record could not be read back.
    #[error("corrupt record at byte offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    /// An internal lock was poisoned by a panicking thread.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
