//! # TIBET
//!
//! Provenance tokens for audit trails: every audited action becomes an
//! immutable, hash-verified token, and tokens link into chains that can be
//! traced and verified end to end.
//!
//! ## Overview
//!
//! - **Tokens**: what happened (`erin`), what it touches (`eraan`), where
//!   (`eromheen`) and why (`erachter`), bound by a BLAKE3 content hash
//! - **Provider**: issues tokens for one actor and persists them
//! - **Stores**: append-only, in memory or as a JSON Lines file
//! - **Chain**: walks `parent_id` links and verifies every hop
//!
//! ## Key Concepts
//!
//! - **Token**: Immutable. Never edited. Changes are new tokens.
//! - **Lifecycle**: `created -> detected -> classified -> mitigated -> resolved`,
//!   one step at a time, each step a new `state_change` token.
//! - **Tampering**: any change to a stored token breaks its content hash.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tibet::{Payload, Provider, ProviderConfig, TokenDraft};
//! use tibet::store::FileStore;
//!
//! fn example() -> tibet::Result<()> {
//!     let store = FileStore::open("audit.jsonl")?;
//!     let provider = Provider::new(ProviderConfig::new("jis:humotica:my_app"), store);
//!
//!     let login = provider.create("user_login", Payload::map([("user", "alice")]))?;
//!     let call = provider.create_with(
//!         TokenDraft::new("api_call")
//!             .erin(Payload::map([("endpoint", "/users")]))
//!             .erachter("Fetch user list for admin dashboard")
//!             .parent(&login.token_id),
//!     )?;
//!
//!     assert!(provider.chain().verify(&call.token_id)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `tibet::core` - Tokens, payloads, canonical encoding, hashing
//! - `tibet::store` - Store trait and backends

pub mod chain;
pub mod error;
pub mod provider;

// Re-export component crates
pub use tibet_core as core;
pub use tibet_store as store;

// Re-export main types for convenience
pub use chain::{Chain, ChainNode, ChainSummary, DEFAULT_TREE_DEPTH};
pub use error::{Result, TibetError};
pub use provider::{
    ExportFormat, Provider, ProviderConfig, TokenCallback, TokenDraft, DEFAULT_ID_PREFIX,
    STATE_CHANGE_ACTION,
};

// Re-export commonly used core and store types
pub use tibet_core::{ContentHash, Payload, Token, TokenBuilder, TokenId, TokenState};
pub use tibet_store::{FileStore, FileVerification, MemoryStore, Store, TokenFilter};
