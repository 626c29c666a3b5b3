//! Error types for the provider and chain walker.

use tibet_core::{CoreError, TokenId};
use tibet_store::StoreError;
use thiserror::Error;

/// Errors that can occur while issuing tokens or walking chains.
#[derive(Debug, Error)]
pub enum TibetError {
    /// Token construction or encoding failed.
    #[error("token error: {0}")]
    Core(#[from] CoreError),

    /// Storage error, including `NotFound` and `Duplicate`.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A token names a parent that the store cannot resolve.
    #[error("broken chain: {token_id} references missing parent {missing_parent}")]
    BrokenChain {
        token_id: TokenId,
        missing_parent: TokenId,
    },

    /// A token already moved to its next state; lifecycles do not branch.
    #[error("token {token_id} was already advanced by {successor}")]
    AlreadyAdvanced {
        token_id: TokenId,
        successor: TokenId,
    },

    /// A token is its own ancestor.
    #[error("cyclic chain: {0} is its own ancestor")]
    CyclicChain(TokenId),

    /// Tokens could not be rendered in the requested format.
    #[error("export error: {0}")]
    Export(String),
}

impl TibetError {
    /// Check whether this is a lookup miss for a token id.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TibetError::Store(StoreError::NotFound(_)))
    }
}

/// Result type for provider and chain operations.
pub type Result<T> = std::result::Result<T, TibetError>;
