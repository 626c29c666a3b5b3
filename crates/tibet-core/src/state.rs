//! Token lifecycle states.
//!
//! The lifecycle is strictly linear:
//! `Created -> Detected -> Classified -> Mitigated -> Resolved`.
//! Most audit events never leave `Created`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Lifecycle state of a token.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TokenState {
    /// Initial state of every token.
    #[default]
    Created,
    Detected,
    Classified,
    Mitigated,
    /// Terminal state.
    Resolved,
}

impl TokenState {
    /// All states in lifecycle order.
    pub const ALL: [TokenState; 5] = [
        TokenState::Created,
        TokenState::Detected,
        TokenState::Classified,
        TokenState::Mitigated,
        TokenState::Resolved,
    ];

    /// The lowercase wire name, as used in canonical encoding and records.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenState::Created => "created",
            TokenState::Detected => "detected",
            TokenState::Classified => "classified",
            TokenState::Mitigated => "mitigated",
            TokenState::Resolved => "resolved",
        }
    }

    /// The immediate successor, or `None` for the terminal state.
    pub fn next(self) -> Option<TokenState> {
        match self {
            TokenState::Created => Some(TokenState::Detected),
            TokenState::Detected => Some(TokenState::Classified),
            TokenState::Classified => Some(TokenState::Mitigated),
            TokenState::Mitigated => Some(TokenState::Resolved),
            TokenState::Resolved => None,
        }
    }

    /// Whether `to` is reachable from `self` in exactly one step.
    pub fn can_advance_to(self, to: TokenState) -> bool {
        self.next() == Some(to)
    }

    /// Check a single transition, returning the target on success.
    pub fn advance_to(self, to: TokenState) -> Result<TokenState, CoreError> {
        if self.can_advance_to(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidTransition { from: self, to })
        }
    }

    /// Check if this is the initial state.
    pub fn is_initial(self) -> bool {
        self == TokenState::Created
    }

    /// Check if this is the terminal state.
    pub fn is_terminal(self) -> bool {
        self == TokenState::Resolved
    }
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| CoreError::Serialization(format!("unknown token state: {}", s)))
    }
}
