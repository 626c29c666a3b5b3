//! Store trait: the abstract interface for token persistence.
//!
//! This trait keeps the provider and chain walker storage-agnostic.
//! Implementations include an in-memory store and an append-only
//! JSON Lines file.

use std::sync::Arc;

use tibet_core::{Token, TokenId};

use crate::error::Result;

/// A lazy sequence of tokens, in insertion order.
///
/// Backends that read from disk surface per-record failures as `Err`
/// items rather than ending the sequence.
pub type TokenIter<'a> = Box<dyn Iterator<Item = Result<Token>> + Send + 'a>;

/// Criteria for [`Store::query`]. Unset fields match everything.
///
/// The timestamp range compares the fixed-width RFC 3339 strings that
/// providers emit, so string order is time order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFilter {
    /// Exact action match.
    pub action: Option<String>,
    /// Exact actor match.
    pub actor: Option<String>,
    /// Inclusive lower bound on `timestamp`.
    pub since: Option<String>,
    /// Exclusive upper bound on `timestamp`.
    pub until: Option<String>,
    /// Exact parent match.
    pub parent_id: Option<TokenId>,
    /// Keep only the most recent this many matches.
    pub limit: Option<usize>,
}

impl TokenFilter {
    /// A filter that matches every token.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    pub fn until(mut self, until: impl Into<String>) -> Self {
        self.until = Some(until.into());
        self
    }

    pub fn parent(mut self, parent_id: impl Into<TokenId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check whether a token satisfies every set criterion.
    pub fn matches(&self, token: &Token) -> bool {
        if let Some(action) = &self.action {
            if &token.action != action {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if &token.actor != actor {
                return false;
            }
        }
        if let Some(since) = &self.since {
            if token.timestamp.as_str() < since.as_str() {
                return false;
            }
        }
        if let Some(until) = &self.until {
            if token.timestamp.as_str() >= until.as_str() {
                return false;
            }
        }
        if let Some(parent) = &self.parent_id {
            if token.parent_id.as_ref() != Some(parent) {
                return false;
            }
        }
        true
    }

    /// Apply this filter to a token sequence, keeping errors in place.
    ///
    /// Without a limit the result is fully lazy. With one, every match is
    /// read first and only the last `limit` tokens are yielded, still in
    /// insertion order.
    pub fn apply<'a, I>(self, tokens: I) -> TokenIter<'a>
    where
        I: Iterator<Item = Result<Token>> + Send + 'a,
    {
        let limit = self.limit;
        let matching = tokens.filter(move |item| match item {
            Ok(token) => self.matches(token),
            Err(_) => true,
        });

        let Some(limit) = limit else {
            return Box::new(matching);
        };
        let items: Vec<Result<Token>> = matching.collect();
        let found = items.iter().filter(|item| item.is_ok()).count();
        let mut skip = found.saturating_sub(limit);
        Box::new(items.into_iter().filter(move |item| {
            if skip > 0 && item.is_ok() {
                skip -= 1;
                false
            } else {
                true
            }
        }))
    }
}

/// The Store trait: append-only token persistence.
///
/// # Design Notes
///
/// - **Append-only**: once a `token_id` is written it is never overwritten
///   or removed. A second `put` with the same id fails with
///   [`StoreError::Duplicate`](crate::StoreError::Duplicate) and leaves the
///   store unchanged.
/// - **Atomic puts**: readers see either the whole token or nothing.
/// - **Insertion order**: `query` and `iter` yield tokens in the order they
///   were stored.
/// - **No validation**: the store persists what it is given; integrity is
///   checked on demand.
pub trait Store: Send + Sync {
    /// Insert a token.
    fn put(&self, token: &Token) -> Result<()>;

    /// Get a token by id, or `NotFound`.
    fn get(&self, id: &TokenId) -> Result<Token>;

    /// Check if a token exists.
    fn contains(&self, id: &TokenId) -> Result<bool>;

    /// Lazily yield tokens matching the filter, in insertion order.
    fn query(&self, filter: &TokenFilter) -> Result<TokenIter<'_>>;

    /// Number of stored tokens.
    fn len(&self) -> Result<usize>;

    /// Check if the store holds no tokens.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All tokens, in insertion order.
    fn iter(&self) -> Result<TokenIter<'_>> {
        self.query(&TokenFilter::new())
    }

    /// All tokens whose `parent_id` is `id`, in insertion order.
    fn children(&self, id: &TokenId) -> Result<Vec<Token>> {
        self.query(&TokenFilter::new().parent(id.clone()))?
            .collect()
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn put(&self, token: &Token) -> Result<()> {
        (**self).put(token)
    }

    fn get(&self, id: &TokenId) -> Result<Token> {
        (**self).get(id)
    }

    fn contains(&self, id: &TokenId) -> Result<bool> {
        (**self).contains(id)
    }

    fn query(&self, filter: &TokenFilter) -> Result<TokenIter<'_>> {
        (**self).query(filter)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}
