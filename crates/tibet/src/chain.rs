//! Chain walker: reconstructs and verifies provenance through `parent_id`.
//!
//! Chains are expected to be acyclic and complete, but the walker trusts
//! neither: a dangling parent is a [`TibetError::BrokenChain`], a repeated
//! id is a [`TibetError::CyclicChain`]. Neither is ever silently truncated.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Duration};
use serde::Serialize;
use tibet_core::{Token, TokenId};
use tibet_store::{Store, StoreError};

use crate::error::{Result, TibetError};

/// Default depth limit for [`Chain::tree`].
pub const DEFAULT_TREE_DEPTH: usize = 10;

/// Provenance chain walker over a store.
pub struct Chain<'a, S: Store + ?Sized> {
    store: &'a S,
}

/// Overview of one chain, from its root to a given token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainSummary {
    /// Number of tokens from the start token to the root, inclusive.
    pub length: usize,
    /// Id of the root token.
    pub root_id: TokenId,
    /// Distinct actors, sorted.
    pub actors: Vec<String>,
    /// Actions in trace order (start token first).
    pub actions: Vec<String>,
    /// Timestamp of the root.
    pub start: String,
    /// Timestamp of the start token.
    pub end: String,
    /// `end - start`, when both timestamps parse as RFC 3339.
    /// Serialized as whole microseconds under `duration_us`.
    #[serde(rename = "duration_us", serialize_with = "serialize_micros")]
    pub duration: Option<Duration>,
    /// Every token in the chain verifies.
    pub valid: bool,
}

fn serialize_micros<S: serde::Serializer>(
    duration: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    duration
        .and_then(|d| d.num_microseconds())
        .serialize(serializer)
}

/// One node of a descendant tree built by [`Chain::tree`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainNode {
    /// A stored token and its children.
    Token {
        token: Token,
        valid: bool,
        children: Vec<ChainNode>,
    },
    /// The id is not in the store.
    Missing { id: TokenId },
    /// The depth limit was reached before this id.
    Truncated { id: TokenId },
}

impl ChainNode {
    /// The token id of this node.
    pub fn id(&self) -> &TokenId {
        match self {
            ChainNode::Token { token, .. } => &token.token_id,
            ChainNode::Missing { id } | ChainNode::Truncated { id } => id,
        }
    }

    /// Direct children; empty for missing and truncated nodes.
    pub fn children(&self) -> &[ChainNode] {
        match self {
            ChainNode::Token { children, .. } => children,
            _ => &[],
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ChainNode::Missing { .. })
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, ChainNode::Truncated { .. })
    }

    /// Number of stored tokens in this subtree.
    pub fn token_count(&self) -> usize {
        match self {
            ChainNode::Token { children, .. } => {
                1 + children.iter().map(ChainNode::token_count).sum::<usize>()
            }
            _ => 0,
        }
    }

    /// True iff every stored token in this subtree verifies.
    pub fn all_valid(&self) -> bool {
        match self {
            ChainNode::Token {
                valid, children, ..
            } => *valid && children.iter().all(ChainNode::all_valid),
            _ => true,
        }
    }
}

impl<'a, S: Store + ?Sized> Chain<'a, S> {
    /// Create a walker over `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Follow `parent_id` links from `token_id` to the root.
    ///
    /// Returns `[start, parent, ..., root]`. An absent or empty `parent_id`
    /// ends the chain.
    pub fn trace(&self, token_id: &TokenId) -> Result<Vec<Token>> {
        let start = self.store.get(token_id)?;

        let mut seen = HashSet::new();
        seen.insert(start.token_id.clone());
        let mut chain = vec![start];

        loop {
            let current = &chain[chain.len() - 1];
            let parent_id = match &current.parent_id {
                Some(parent) if !parent.is_empty() => parent.clone(),
                _ => break,
            };

            if !seen.insert(parent_id.clone()) {
                tracing::warn!(token_id = %parent_id, "cycle in provenance chain");
                return Err(TibetError::CyclicChain(parent_id));
            }

            let parent = match self.store.get(&parent_id) {
                Ok(parent) => parent,
                Err(StoreError::NotFound(_)) => {
                    tracing::warn!(
                        token_id = %current.token_id,
                        missing_parent = %parent_id,
                        "broken provenance chain"
                    );
                    return Err(TibetError::BrokenChain {
                        token_id: current.token_id.clone(),
                        missing_parent: parent_id,
                    });
                }
                Err(e) => return Err(e.into()),
            };
            chain.push(parent);
        }

        Ok(chain)
    }

    /// Check that every token from `token_id` to the root verifies.
    ///
    /// Trace failures are returned unchanged.
    pub fn verify(&self, token_id: &TokenId) -> Result<bool> {
        Ok(self.trace(token_id)?.iter().all(Token::verify))
    }

    /// Summarise the chain ending at `token_id`.
    pub fn summary(&self, token_id: &TokenId) -> Result<ChainSummary> {
        let chain = self.trace(token_id)?;
        // trace always returns at least the start token
        let leaf = &chain[0];
        let root = &chain[chain.len() - 1];

        let actors: BTreeSet<&str> = chain.iter().map(|t| t.actor.as_str()).collect();

        Ok(ChainSummary {
            length: chain.len(),
            root_id: root.token_id.clone(),
            actors: actors.into_iter().map(String::from).collect(),
            actions: chain.iter().map(|t| t.action.clone()).collect(),
            start: root.timestamp.clone(),
            end: leaf.timestamp.clone(),
            duration: time_span(&root.timestamp, &leaf.timestamp),
            valid: chain.iter().all(Token::verify),
        })
    }

    /// The root of the chain containing `token_id`.
    pub fn root(&self, token_id: &TokenId) -> Result<Token> {
        let mut chain = self.trace(token_id)?;
        chain
            .pop()
            .ok_or_else(|| StoreError::NotFound(token_id.clone()).into())
    }

    /// Tokens whose parent is `token_id`, in insertion order.
    pub fn children(&self, token_id: &TokenId) -> Result<Vec<Token>> {
        Ok(self.store.children(token_id)?)
    }

    /// Build the descendant tree of `root_id`, at most `max_depth` levels
    /// below it.
    ///
    /// A root missing from the store yields a single `Missing` node rather
    /// than an error. Nodes beyond the limit are `Truncated`.
    pub fn tree(&self, root_id: &TokenId, max_depth: usize) -> Result<ChainNode> {
        let root = match self.store.get(root_id) {
            Ok(root) => root,
            Err(StoreError::NotFound(_)) => {
                return Ok(ChainNode::Missing {
                    id: root_id.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut by_parent: HashMap<TokenId, Vec<Token>> = HashMap::new();
        for token in self.store.iter()? {
            let token = token?;
            if let Some(parent) = token.parent_id.clone() {
                by_parent.entry(parent).or_default().push(token);
            }
        }

        Ok(build_node(root, 0, max_depth, &mut by_parent))
    }
}

fn build_node(
    token: Token,
    depth: usize,
    max_depth: usize,
    by_parent: &mut HashMap<TokenId, Vec<Token>>,
) -> ChainNode {
    // Taking the children out of the map also stops a cycle from being
    // expanded twice.
    let children = by_parent
        .remove(&token.token_id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| {
            if depth + 1 > max_depth {
                ChainNode::Truncated { id: child.token_id }
            } else {
                build_node(child, depth + 1, max_depth, by_parent)
            }
        })
        .collect();

    ChainNode::Token {
        valid: token.verify(),
        token,
        children,
    }
}

fn time_span(start: &str, end: &str) -> Option<Duration> {
    let start = DateTime::parse_from_rfc3339(start).ok()?;
    let end = DateTime::parse_from_rfc3339(end).ok()?;
    Some(end.signed_duration_since(start))
}
