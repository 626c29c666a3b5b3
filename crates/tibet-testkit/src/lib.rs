//! # TIBET Testkit
//!
//! Testing utilities for TIBET.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known tokens with their expected canonical bytes and content hashes
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! Golden vectors pin the canonical encoding across implementations:
//!
//! ```rust
//! use tibet_testkit::vectors::{all_vectors, token_from_vector};
//!
//! for vector in all_vectors() {
//!     let token = token_from_vector(&vector).unwrap();
//!     assert_eq!(token.content_hash.as_str(), vector.expected_hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use tibet_testkit::generators::{token_from_params, TokenParams};
//!
//! proptest! {
//!     #[test]
//!     fn content_hash_is_deterministic(params: TokenParams) {
//!         let t1 = token_from_params(&params);
//!         let t2 = token_from_params(&params);
//!         prop_assert_eq!(t1.content_hash, t2.content_hash);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use tibet_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let chain = fixture.make_chain(3);
//! assert_eq!(chain.len(), 3);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_actor_fixtures, raw_token, FileFixture, TestFixture};
pub use generators::{token_from_params, TokenParams};
pub use vectors::{all_vectors, token_from_vector, verify_all_vectors, GoldenVector};
