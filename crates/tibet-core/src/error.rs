//! Error types for the TIBET core.

use thiserror::Error;

use crate::state::TokenState;

/// A payload value that has no canonical representation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("non-finite float has no canonical encoding: {0}")]
    NonFiniteFloat(f64),

    #[error("integer out of range for canonical encoding: {0}")]
    IntegerOutOfRange(String),

    #[error("unsupported payload value: {0}")]
    Unsupported(String),
}

/// Core errors that can occur while building or checking tokens.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: TokenState, to: TokenState },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}
