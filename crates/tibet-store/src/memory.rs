//! In-memory implementation of the Store trait.
//!
//! Same semantics as the file store but nothing survives the process.
//! Good for tests, short sessions and ephemeral audits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tibet_core::{Token, TokenId};

use crate::error::{Result, StoreError};
use crate::traits::{Store, TokenFilter, TokenIter};

/// In-memory store implementation.
///
/// Thread-safe via RwLock. Queries iterate over a snapshot taken at call
/// time, so a concurrent `put` never shows up half-written.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Tokens in insertion order.
    tokens: Vec<Arc<Token>>,

    /// Id index: token_id -> position in `tokens`.
    index: HashMap<TokenId, usize>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn put(&self, token: &Token) -> Result<()> {
        let mut inner = self.write()?;

        if inner.index.contains_key(&token.token_id) {
            return Err(StoreError::Duplicate(token.token_id.clone()));
        }

        let position = inner.tokens.len();
        inner.tokens.push(Arc::new(token.clone()));
        inner.index.insert(token.token_id.clone(), position);

        tracing::debug!(token_id = %token.token_id, action = %token.action, "stored token in memory");
        Ok(())
    }

    fn get(&self, id: &TokenId) -> Result<Token> {
        let inner = self.read()?;
        inner
            .index
            .get(id)
            .map(|&position| Token::clone(&inner.tokens[position]))
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn contains(&self, id: &TokenId) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.index.contains_key(id))
    }

    fn query(&self, filter: &TokenFilter) -> Result<TokenIter<'_>> {
        let snapshot: Vec<Arc<Token>> = self.read()?.tokens.clone();
        let tokens = snapshot.into_iter().map(|token| Ok(Token::clone(&token)));
        Ok(filter.clone().apply(tokens))
    }

    fn len(&self) -> Result<usize> {
        let inner = self.read()?;
        Ok(inner.tokens.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tibet_core::{Payload, TokenBuilder};

    fn make_token(id: &str, action: &str, ts: &str) -> Token {
        TokenBuilder::new(id, action, ts, "jis:test:store")
            .erin(Payload::map([("n", id)]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let token = make_token("t1", "login", "2026-01-01T00:00:00.000000Z");

        store.put(&token).unwrap();

        let retrieved = store.get(&token.token_id).unwrap();
        assert_eq!(retrieved, token);
        assert!(store.contains(&token.token_id).unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_memory_store_duplicate_rejected() {
        let store = MemoryStore::new();
        let token = make_token("t1", "login", "2026-01-01T00:00:00.000000Z");

        store.put(&token).unwrap();
        let result = store.put(&token);
        assert!(matches!(result, Err(StoreError::Duplicate(id)) if id == token.token_id));
        assert_eq!(store.len().unwrap(), 1);

        // A different token reusing the id is rejected too, and the
        // original survives untouched.
        let imposter = make_token("t1", "search", "2026-01-02T00:00:00.000000Z");
        assert!(matches!(store.put(&imposter), Err(StoreError::Duplicate(_))));
        assert_eq!(store.get(&token.token_id).unwrap().action, "login");
    }

    #[test]
    fn test_memory_store_not_found() {
        let store = MemoryStore::new();
        let result = store.get(&TokenId::new("missing"));
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id.as_str() == "missing"));
    }

    #[test]
    fn test_query_by_action_keeps_insertion_order() {
        let store = MemoryStore::new();
        let actions = ["login", "search", "search", "login", "search"];
        for (i, action) in actions.iter().enumerate() {
            let ts = format!("2026-01-01T00:00:0{}.000000Z", i);
            store.put(&make_token(&format!("t{}", i), action, &ts)).unwrap();
        }

        let logins: Vec<Token> = store
            .query(&TokenFilter::new().action("login"))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        let ids: Vec<&str> = logins.iter().map(|t| t.token_id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t3"]);
    }

    #[test]
    fn test_query_limit_and_range() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let ts = format!("2026-01-01T00:00:0{}.000000Z", i);
            store.put(&make_token(&format!("t{}", i), "tick", &ts)).unwrap();
        }

        let filter = TokenFilter::new()
            .since("2026-01-01T00:00:01.000000Z")
            .until("2026-01-01T00:00:04.000000Z");
        let ids: Vec<String> = store
            .query(&filter)
            .unwrap()
            .map(|t| t.unwrap().token_id.into_string())
            .collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);

        let latest: Vec<String> = store
            .query(&TokenFilter::new().limit(2))
            .unwrap()
            .map(|t| t.unwrap().token_id.into_string())
            .collect();
        assert_eq!(latest, vec!["t3", "t4"]);

        let latest_in_range: Vec<String> = store
            .query(&filter.limit(1))
            .unwrap()
            .map(|t| t.unwrap().token_id.into_string())
            .collect();
        assert_eq!(latest_in_range, vec!["t3"]);
    }

    #[test]
    fn test_query_is_a_snapshot() {
        let store = MemoryStore::new();
        store
            .put(&make_token("a", "x", "2026-01-01T00:00:00.000000Z"))
            .unwrap();

        let iter = store.iter().unwrap();
        store
            .put(&make_token("b", "x", "2026-01-01T00:00:01.000000Z"))
            .unwrap();

        assert_eq!(iter.count(), 1);
        assert_eq!(store.iter().unwrap().count(), 2);
    }

    #[test]
    fn test_children() {
        let store = MemoryStore::new();
        let root = make_token("root", "x", "2026-01-01T00:00:00.000000Z");
        store.put(&root).unwrap();
        for i in 0..3 {
            let child = TokenBuilder::new(format!("c{}", i), "x", "2026-01-01T00:00:01.000000Z", "a")
                .parent("root")
                .build()
                .unwrap();
            store.put(&child).unwrap();
        }

        let children = store.children(&root.token_id).unwrap();
        assert_eq!(children.len(), 3);
        assert!(children.iter().all(|c| c.parent_id.as_ref() == Some(&root.token_id)));
    }

    #[test]
    fn test_concurrent_puts_and_reads() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let id = format!("w{}-{}", worker, i);
                        store
                            .put(&make_token(&id, "tick", "2026-01-01T00:00:00.000000Z"))
                            .unwrap();
                        assert!(store.iter().unwrap().all(|t| t.unwrap().verify()));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len().unwrap(), 100);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        proptest! {
            #[test]
            fn len_counts_distinct_ids(
                puts in prop::collection::vec(("[a-e]{1,2}", prop::sample::select(vec!["login", "search"])), 0..40)
            ) {
                let store = MemoryStore::new();
                let mut seen = HashSet::new();
                let mut logins = Vec::new();

                for (id, action) in &puts {
                    let token = make_token(id, action, "2026-01-01T00:00:00.000000Z");
                    let fresh = seen.insert(id.clone());
                    prop_assert_eq!(store.put(&token).is_ok(), fresh);
                    if fresh && *action == "login" {
                        logins.push(token.token_id.clone());
                    }
                }

                prop_assert_eq!(store.len().unwrap(), seen.len());
                let found: Vec<TokenId> = store
                    .query(&TokenFilter::new().action("login"))
                    .unwrap()
                    .map(|t| t.unwrap().token_id)
                    .collect();
                prop_assert_eq!(found, logins);
            }
        }
    }
}
