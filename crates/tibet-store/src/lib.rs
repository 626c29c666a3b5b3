//! # TIBET Store
//!
//! Storage abstraction for TIBET tokens. Provides a trait-based interface
//! for append-only token persistence with in-memory and file-backed
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts token storage behind the [`Store`] trait,
//! allowing the provider and chain walker to be storage-agnostic. The
//! durable implementation is [`FileStore`], with [`MemoryStore`] for tests
//! and short-lived sessions.
//!
//! ## Key Types
//!
//! - [`Store`] - The trait for all storage operations
//! - [`FileStore`] - Append-only JSON Lines file
//! - [`MemoryStore`] - In-memory storage
//! - [`TokenFilter`] - Query criteria
//! - [`FileVerification`] - Result of a full-file integrity scan
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tibet_core::TokenBuilder;
//! use tibet_store::{FileStore, Store, TokenFilter};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FileStore::open("audit.jsonl")?;
//!
//!     let token = TokenBuilder::new("t1", "login", "2026-01-01T00:00:00.000000Z", "jis:app")
//!         .build()?;
//!     store.put(&token)?;
//!
//!     for token in store.query(&TokenFilter::new().action("login"))? {
//!         println!("{}", token?);
//!     }
//!
//!     let report = store.verify_file()?;
//!     assert!(report.integrity);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only**: a second `put` with the same `token_id` fails with `Duplicate`
//! - **No validation on write**: integrity is checked on demand
//! - **Insertion order**: iteration follows the order tokens were stored
//! - **Corruption as data**: `verify_file` reports bad records instead of failing

pub mod error;
pub mod file;
pub mod memory;
mod record;
pub mod traits;

pub use error::{Result, StoreError};
pub use file::{verify_file, FileStore, FileVerification};
pub use memory::MemoryStore;
pub use traits::{Store, TokenFilter, TokenIter};
