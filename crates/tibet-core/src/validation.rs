//! Token validation: required fields and integrity checks.

use crate::error::CoreError;
use crate::token::Token;
use crate::types::TokenId;

/// Validate the required scalar fields of a token.
///
/// - `token_id`, `action`, `timestamp`, `actor` must be non-empty
/// - `token_id`, `action`, `actor` must not contain control characters
///
/// Any other non-empty actor is accepted; the `domain:identifier`
/// convention is not enforced here.
pub fn validate_token_fields(
    token_id: &str,
    action: &str,
    timestamp: &str,
    actor: &str,
) -> Result<(), CoreError> {
    require_non_empty("token_id", token_id)?;
    require_non_empty("action", action)?;
    require_non_empty("timestamp", timestamp)?;
    require_non_empty("actor", actor)?;

    reject_control_chars("token_id", token_id)?;
    reject_control_chars("action", action)?;
    reject_control_chars("actor", actor)?;
    reject_control_chars("timestamp", timestamp)?;

    Ok(())
}

/// Validate an optional parent link.
///
/// An empty parent is accepted and ends a chain just like an absent one;
/// the canonical encoding still tells the two apart. Control characters
/// are rejected as in `token_id`.
pub fn validate_parent(parent_id: Option<&TokenId>) -> Result<(), CoreError> {
    match parent_id {
        Some(parent) => reject_control_chars("parent_id", parent.as_str()),
        None => Ok(()),
    }
}

/// Validate a complete token: required fields plus hash integrity.
///
/// Useful for tokens that arrive from outside a provider, e.g. read
/// back from an export.
pub fn validate_token(token: &Token) -> Result<(), CoreError> {
    validate_token_fields(
        token.token_id.as_str(),
        &token.action,
        &token.timestamp,
        &token.actor,
    )?;

    validate_parent(token.parent_id.as_ref())?;

    let computed = token.compute_hash()?;
    if computed != token.content_hash {
        return Err(CoreError::InvalidToken(format!(
            "content hash mismatch for {}: stored {}, computed {}",
            token.token_id, token.content_hash, computed
        )));
    }

    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::InvalidToken(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn reject_control_chars(field: &str, value: &str) -> Result<(), CoreError> {
    if let Some(c) = value.chars().find(|c| c.is_control()) {
        return Err(CoreError::InvalidToken(format!(
            "{} contains control character {:?}",
            field, c
        )));
    }
    Ok(())
}
