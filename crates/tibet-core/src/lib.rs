//! # TIBET Core
//!
//! Pure primitives for TIBET provenance tokens: payloads, canonical
//! encoding, hashing, and the token state machine.
//!
//! This crate contains no I/O and no storage. It is pure computation over
//! token data structures.
//!
//! ## Key Types
//!
//! - [`Token`] - An immutable, hash-verified record of one audited action
//! - [`TokenId`] - Opaque unique identifier
//! - [`Payload`] - Closed variant type for `erin` and `eromheen`
//! - [`ContentHash`] - BLAKE3 digest of the canonical encoding
//! - [`TokenState`] - Linear lifecycle state
//!
//! ## Canonicalization
//!
//! Token content is encoded as deterministic CBOR before hashing. See the
//! [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod payload;
pub mod state;
pub mod token;
pub mod types;
pub mod validation;

pub use canonical::{canonical_payload_bytes, canonical_token_bytes};
pub use crypto::ContentHash;
pub use error::{CoreError, EncodingError};
pub use payload::{Payload, PayloadMap};
pub use state::TokenState;
pub use token::{Token, TokenBuilder};
pub use types::TokenId;
pub use validation::{validate_parent, validate_token, validate_token_fields};
