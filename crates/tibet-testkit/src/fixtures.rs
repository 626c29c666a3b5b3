//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tibet::{FileStore, MemoryStore, Payload, Provider, ProviderConfig, Store};
use tibet_core::{Token, TokenBuilder, TokenId, TokenState};

/// Timestamp used by fixture tokens built outside a provider.
pub const FIXTURE_TIMESTAMP: &str = "2026-01-14T12:00:00.000000Z";

/// A test fixture with a provider over a shared memory store.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub provider: Provider<Arc<MemoryStore>>,
}

impl TestFixture {
    /// Create a fixture for a default test actor.
    pub fn new() -> Self {
        Self::with_actor("jis:test:fixture")
    }

    /// Create a fixture bound to `actor`.
    pub fn with_actor(actor: &str) -> Self {
        Self::with_config(ProviderConfig::new(actor))
    }

    /// Create a fixture with a full provider configuration.
    pub fn with_config(config: ProviderConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let provider = Provider::new(config, Arc::clone(&store));
        Self { store, provider }
    }

    /// Issue `len` tokens, each the child of the previous one.
    ///
    /// Returned oldest first.
    pub fn make_chain(&self, len: usize) -> Vec<Token> {
        let mut chain: Vec<Token> = Vec::with_capacity(len);
        for i in 0..len {
            let mut draft = tibet::TokenDraft::new(format!("step_{}", i))
                .erin(Payload::map([("step", i as i64)]));
            if let Some(parent) = chain.last() {
                draft = draft.parent(&parent.token_id);
            }
            let token = self
                .provider
                .create_with(draft)
                .unwrap_or_else(|e| panic!("fixture chain step {} failed: {}", i, e));
            chain.push(token);
        }
        chain
    }

    /// Store a token built by hand, bypassing the provider.
    ///
    /// Lets tests plant broken or cyclic links that a provider would never
    /// produce.
    pub fn insert_raw(&self, token: &Token) {
        self.store
            .put(token)
            .unwrap_or_else(|e| panic!("fixture insert of {} failed: {}", token.token_id, e));
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a valid token by hand with a fixed timestamp.
pub fn raw_token(id: &str, action: &str, parent: Option<&str>) -> Token {
    TokenBuilder::new(id, action, FIXTURE_TIMESTAMP, "jis:test:raw")
        .erin(Payload::map([("id", id)]))
        .parent_opt(parent.map(TokenId::from))
        .state(TokenState::Created)
        .build()
        .unwrap_or_else(|e| panic!("raw token {} failed validation: {}", id, e))
}

/// A file store in a temporary directory, removed on drop.
pub struct FileFixture {
    /// Held so the directory outlives the store.
    pub dir: TempDir,
    pub path: PathBuf,
    pub store: FileStore,
}

impl FileFixture {
    /// Create an empty file store in a fresh temporary directory.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("temp dir: {}", e));
        let path = dir.path().join("tokens.jsonl");
        let store = FileStore::open(&path).unwrap_or_else(|e| panic!("open store: {}", e));
        Self { dir, path, store }
    }

    /// Drop the current store and open the file again, as after a restart.
    pub fn reopen(&mut self) {
        self.store = FileStore::open(&self.path).unwrap_or_else(|e| panic!("reopen store: {}", e));
    }
}

impl Default for FileFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Providers for several actors over one shared store.
pub fn multi_actor_fixtures(
    count: usize,
) -> (Arc<MemoryStore>, Vec<Provider<Arc<MemoryStore>>>) {
    let store = Arc::new(MemoryStore::new());
    let providers = (0..count)
        .map(|i| {
            Provider::new(
                ProviderConfig::new(format!("jis:test:actor_{}", i)),
                Arc::clone(&store),
            )
        })
        .collect();
    (store, providers)
}
