//! Token: the atomic unit of provenance.
//!
//! A token records one audited action:
//! - `erin`: what is in the action (content)
//! - `eraan`: what it is attached to (references)
//! - `eromheen`: what surrounds it (context, environment)
//! - `erachter`: why it happened (intent)
//!
//! Tokens are immutable once built. Fields are public for reading; any
//! later change to a field breaks `content_hash`, which [`Token::verify`]
//! reports. Lifecycle changes are new tokens linked by `parent_id`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::canonical::canonical_token_bytes;
use crate::crypto::ContentHash;
use crate::error::{CoreError, EncodingError};
use crate::payload::Payload;
use crate::state::TokenState;
use crate::types::TokenId;
use crate::validation::{validate_parent, validate_token_fields};

/// A TIBET provenance token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Token {
    /// Unique identifier, never reused.
    pub token_id: TokenId,

    /// Free-form operation type (e.g. "login", "search", "api_call").
    pub action: String,

    /// Creation time, RFC 3339 UTC with fixed precision.
    pub timestamp: String,

    /// Who or what performed the action. Opaque to the core.
    pub actor: String,

    /// Content of the action.
    pub erin: Payload,

    /// References the action is attached to, in order.
    pub eraan: Vec<String>,

    /// Context and environment.
    pub eromheen: Payload,

    /// Intent: the audit justification.
    pub erachter: String,

    /// Parent token for chain linking. Weak reference; may live elsewhere.
    pub parent_id: Option<TokenId>,

    /// Lifecycle state.
    pub state: TokenState,

    /// BLAKE3 digest of the canonical encoding of all fields above.
    pub content_hash: ContentHash,
}

impl Token {
    /// Recompute the content hash from the current field values.
    pub fn compute_hash(&self) -> Result<ContentHash, EncodingError> {
        let bytes = canonical_token_bytes(self)?;
        Ok(ContentHash::compute(&bytes))
    }

    /// Check that `content_hash` matches the current field values.
    ///
    /// A token whose payload can no longer be encoded does not verify.
    pub fn verify(&self) -> bool {
        match self.compute_hash() {
            Ok(hash) => hash == self.content_hash,
            Err(_) => false,
        }
    }

    /// Check if this token starts a chain.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Serialize to a single JSON line (no trailing newline).
    ///
    /// Object keys are sorted, so records read the same regardless of
    /// struct field order.
    pub fn to_json_line(&self) -> Result<String, CoreError> {
        let fields: BTreeMap<String, serde_json::Value> = match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            other => return Err(CoreError::Serialization(format!("expected object, got {}", other))),
        };
        Ok(serde_json::to_string(&fields)?)
    }

    /// Parse a token from a JSON record. Does not verify the hash.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.token_id.as_str();
        let short = id.get(..id.len().min(16)).unwrap_or(id);
        write!(f, "Token({}, actor={}, id={}...)", self.action, self.actor, short)
    }
}

/// Builder for creating tokens.
///
/// `build` validates the required fields and computes the content hash.
pub struct TokenBuilder {
    token_id: TokenId,
    action: String,
    timestamp: String,
    actor: String,
    erin: Payload,
    eraan: Vec<String>,
    eromheen: Payload,
    erachter: String,
    parent_id: Option<TokenId>,
    state: TokenState,
}

impl TokenBuilder {
    /// Start building a token.
    pub fn new(
        token_id: impl Into<TokenId>,
        action: impl Into<String>,
        timestamp: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            token_id: token_id.into(),
            action: action.into(),
            timestamp: timestamp.into(),
            actor: actor.into(),
            erin: Payload::Null,
            eraan: Vec::new(),
            eromheen: Payload::empty_map(),
            erachter: String::new(),
            parent_id: None,
            state: TokenState::Created,
        }
    }

    /// Set the content payload.
    pub fn erin(mut self, erin: impl Into<Payload>) -> Self {
        self.erin = erin.into();
        self
    }

    /// Set the references.
    pub fn eraan(mut self, eraan: Vec<String>) -> Self {
        self.eraan = eraan;
        self
    }

    /// Add a single reference.
    pub fn add_ref(mut self, reference: impl Into<String>) -> Self {
        self.eraan.push(reference.into());
        self
    }

    /// Set the context payload.
    pub fn eromheen(mut self, eromheen: impl Into<Payload>) -> Self {
        self.eromheen = eromheen.into();
        self
    }

    /// Set the intent.
    pub fn erachter(mut self, erachter: impl Into<String>) -> Self {
        self.erachter = erachter.into();
        self
    }

    /// Set the parent token.
    pub fn parent(mut self, parent_id: impl Into<TokenId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set or clear the parent token.
    pub fn parent_opt(mut self, parent_id: Option<TokenId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set the lifecycle state.
    pub fn state(mut self, state: TokenState) -> Self {
        self.state = state;
        self
    }

    /// Validate the fields and compute the content hash.
    pub fn build(self) -> Result<Token, CoreError> {
        validate_token_fields(
            self.token_id.as_str(),
            &self.action,
            &self.timestamp,
            &self.actor,
        )?;
        validate_parent(self.parent_id.as_ref())?;

        let mut token = Token {
            token_id: self.token_id,
            action: self.action,
            timestamp: self.timestamp,
            actor: self.actor,
            erin: self.erin,
            eraan: self.eraan,
            eromheen: self.eromheen,
            erachter: self.erachter,
            parent_id: self.parent_id,
            state: self.state,
            content_hash: ContentHash::default(),
        };
        token.content_hash = token.compute_hash()?;
        Ok(token)
    }
}
