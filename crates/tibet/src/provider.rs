//! The Provider: issues tokens for one actor and persists them.
//!
//! A provider is bound to its configuration for its whole lifetime.
//! Several providers may share one store (wrap it in an `Arc`); they never
//! share any other state.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tibet_core::{CoreError, Payload, Token, TokenBuilder, TokenId, TokenState};
use tibet_store::{Store, TokenFilter, TokenIter};

use crate::chain::Chain;
use crate::error::{Result, TibetError};

/// Action name of the tokens issued by [`Provider::advance_state`].
pub const STATE_CHANGE_ACTION: &str = "state_change";

/// Default prefix for generated token ids.
pub const DEFAULT_ID_PREFIX: &str = "tibet";

/// Configuration for a Provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Actor bound to every token this provider issues.
    pub actor: String,

    /// Prefix for generated token ids.
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// Link each new token to the previous one from this provider when no
    /// explicit parent is given.
    #[serde(default)]
    pub auto_chain: bool,
}

fn default_id_prefix() -> String {
    DEFAULT_ID_PREFIX.to_string()
}

impl ProviderConfig {
    /// Configuration for `actor` with default options.
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            id_prefix: default_id_prefix(),
            auto_chain: false,
        }
    }

    /// Use a different id prefix.
    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Enable or disable automatic chaining.
    pub fn auto_chain(mut self, enabled: bool) -> Self {
        self.auto_chain = enabled;
        self
    }
}

/// The caller-supplied part of a new token.
///
/// Everything else (id, timestamp, actor, state, hash) is filled in by the
/// provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDraft {
    pub action: String,
    pub erin: Payload,
    pub eraan: Vec<String>,
    pub eromheen: Payload,
    pub erachter: String,
    pub parent_id: Option<TokenId>,
}

impl TokenDraft {
    /// A draft with empty content, references and context.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            erin: Payload::Null,
            eraan: Vec::new(),
            eromheen: Payload::empty_map(),
            erachter: String::new(),
            parent_id: None,
        }
    }

    pub fn erin(mut self, erin: impl Into<Payload>) -> Self {
        self.erin = erin.into();
        self
    }

    pub fn eraan(mut self, eraan: Vec<String>) -> Self {
        self.eraan = eraan;
        self
    }

    pub fn add_ref(mut self, reference: impl Into<String>) -> Self {
        self.eraan.push(reference.into());
        self
    }

    pub fn eromheen(mut self, eromheen: impl Into<Payload>) -> Self {
        self.eromheen = eromheen.into();
        self
    }

    pub fn erachter(mut self, erachter: impl Into<String>) -> Self {
        self.erachter = erachter.into();
        self
    }

    pub fn parent(mut self, parent_id: impl Into<TokenId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Output formats for [`Provider::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One pretty-printed JSON array.
    Json,
    /// One record per line, newline-terminated.
    #[serde(rename = "jsonl")]
    JsonLines,
}

/// Hook run once for every token a provider persists.
pub type TokenCallback = Box<dyn Fn(&Token) + Send + Sync>;

/// Token provider for a single actor.
///
/// Provides:
/// - Issuing tokens with fresh ids and timestamps
/// - Lifecycle changes as new linked tokens
/// - Lookup, query, verification and export over the store
pub struct Provider<S: Store> {
    /// Configuration, fixed at construction.
    config: ProviderConfig,
    /// The storage backend.
    store: S,
    /// Last token issued by this provider, for auto-chaining.
    last_token: Mutex<Option<TokenId>>,
    /// Called after each successful put.
    on_token: Option<TokenCallback>,
}

impl<S: Store> Provider<S> {
    /// Create a provider over `store`.
    pub fn new(config: ProviderConfig, store: S) -> Self {
        Self {
            config,
            store,
            last_token: Mutex::new(None),
            on_token: None,
        }
    }

    /// Run `callback` for every token this provider persists.
    ///
    /// The callback runs after the token is stored and outside the
    /// provider's lock, so it may call back into the provider. It is not
    /// run when issuing fails.
    pub fn on_token(mut self, callback: impl Fn(&Token) + Send + Sync + 'static) -> Self {
        self.on_token = Some(Box::new(callback));
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Get the bound actor.
    pub fn actor(&self) -> &str {
        &self.config.actor
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// A chain walker over this provider's store.
    pub fn chain(&self) -> Chain<'_, S> {
        Chain::new(&self.store)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Issuing
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a token with content only.
    pub fn create(&self, action: impl Into<String>, erin: impl Into<Payload>) -> Result<Token> {
        self.create_with(TokenDraft::new(action).erin(erin))
    }

    /// Issue a token from a full draft.
    ///
    /// The token is persisted before it is returned; a store failure is
    /// returned as is and nothing is retried.
    pub fn create_with(&self, draft: TokenDraft) -> Result<Token> {
        self.issue(draft, TokenState::Created, None)
    }

    /// Record that `token_id` moved to the next lifecycle state.
    ///
    /// Issues a new `state_change` token whose parent is `token_id` and
    /// whose state is the successor of the original's. The original token
    /// is left untouched. Fails with `InvalidTransition` from `RESOLVED`,
    /// and with `AlreadyAdvanced` if `token_id` already has a successor:
    /// a lifecycle never branches.
    pub fn advance_state(&self, token_id: &TokenId, reason: &str) -> Result<Token> {
        let original = self.store.get(token_id)?;
        let to = original.state.next().ok_or(CoreError::InvalidTransition {
            from: original.state,
            to: original.state,
        })?;
        self.record_transition(&original, to, reason)
    }

    /// Record a transition of `token_id` to an explicit state.
    ///
    /// Only the immediate successor is accepted, and only once per token.
    pub fn transition(&self, token_id: &TokenId, to: TokenState, reason: &str) -> Result<Token> {
        let original = self.store.get(token_id)?;
        let to = original.state.advance_to(to)?;
        self.record_transition(&original, to, reason)
    }

    fn record_transition(&self, original: &Token, to: TokenState, reason: &str) -> Result<Token> {
        let from = original.state;
        let erachter = if reason.is_empty() {
            format!("State change: {} -> {}", from, to)
        } else {
            reason.to_string()
        };

        let draft = TokenDraft::new(STATE_CHANGE_ACTION)
            .erin(Payload::map([
                ("token_id", original.token_id.as_str()),
                ("old_state", from.as_str()),
                ("new_state", to.as_str()),
            ]))
            .add_ref(original.token_id.as_str())
            .erachter(erachter)
            .parent(&original.token_id);

        self.issue(draft, to, Some(&original.token_id))
    }

    /// The `state_change` token that advanced `token_id`, if any.
    pub fn successor(&self, token_id: &TokenId) -> Result<Option<Token>> {
        for token in self.store.query(&TokenFilter::new().parent(token_id))? {
            let token = token?;
            if token.action == STATE_CHANGE_ACTION {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }

    fn issue(
        &self,
        draft: TokenDraft,
        state: TokenState,
        advances: Option<&TokenId>,
    ) -> Result<Token> {
        // Held across the put so auto-chained tokens link in issue order.
        let mut last = self
            .last_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Checked under the lock so two advances through this provider
        // cannot both pass.
        if let Some(original) = advances {
            if let Some(successor) = self.successor(original)? {
                return Err(TibetError::AlreadyAdvanced {
                    token_id: original.clone(),
                    successor: successor.token_id,
                });
            }
        }

        let parent_id = match draft.parent_id {
            Some(parent) => Some(parent),
            None if self.config.auto_chain => last.clone(),
            None => None,
        };

        let now = Utc::now();
        let token = TokenBuilder::new(
            generate_token_id(&self.config.id_prefix, &now),
            draft.action,
            format_timestamp(&now),
            self.config.actor.as_str(),
        )
        .erin(draft.erin)
        .eraan(draft.eraan)
        .eromheen(draft.eromheen)
        .erachter(draft.erachter)
        .parent_opt(parent_id)
        .state(state)
        .build()?;

        self.store.put(&token)?;
        *last = Some(token.token_id.clone());
        drop(last);

        tracing::debug!(
            token_id = %token.token_id,
            action = %token.action,
            actor = %token.actor,
            state = %token.state,
            "issued token"
        );

        if let Some(callback) = &self.on_token {
            callback(&token);
        }
        Ok(token)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a token by id.
    pub fn get(&self, token_id: &TokenId) -> Result<Token> {
        Ok(self.store.get(token_id)?)
    }

    /// Lazily find tokens matching `filter`, in insertion order.
    pub fn find(&self, filter: &TokenFilter) -> Result<TokenIter<'_>> {
        Ok(self.store.query(filter)?)
    }

    /// Number of tokens in the store.
    pub fn count(&self) -> Result<usize> {
        Ok(self.store.len()?)
    }

    /// Verify every stored token, keyed by id in insertion order.
    pub fn verify_all(&self) -> Result<IndexMap<TokenId, bool>> {
        let mut results = IndexMap::new();
        for token in self.store.iter()? {
            let token = token?;
            let valid = token.verify();
            if !valid {
                tracing::warn!(token_id = %token.token_id, "token failed verification");
            }
            results.insert(token.token_id, valid);
        }
        Ok(results)
    }

    /// Render every stored token in `format`.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        let tokens = self
            .store
            .iter()?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        match format {
            ExportFormat::Json => serde_json::to_string_pretty(&tokens)
                .map_err(|e| TibetError::Export(e.to_string())),
            ExportFormat::JsonLines => {
                let mut out = String::new();
                for token in &tokens {
                    out.push_str(&token.to_json_line()?);
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }
}

/// Generate a token id: `<prefix>_<YYYYmmddHHMMSSffffff>_<32 hex chars>`.
///
/// The random part carries 128 bits, so ids stay unique across processes
/// that share a clock tick.
pub fn generate_token_id(prefix: &str, now: &DateTime<Utc>) -> TokenId {
    let random: [u8; 16] = rand::random();
    TokenId::new(format!(
        "{}_{}_{}",
        prefix,
        now.format("%Y%m%d%H%M%S%6f"),
        hex::encode(random)
    ))
}

/// Format a timestamp as RFC 3339 UTC with microseconds.
///
/// The width is fixed, so string order is time order.
pub fn format_timestamp(now: &DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tibet_store::MemoryStore;

    fn provider() -> Provider<MemoryStore> {
        Provider::new(ProviderConfig::new("jis:test:provider"), MemoryStore::new())
    }

    #[test]
    fn test_timestamp_format() {
        let t = Utc.with_ymd_and_hms(2026, 1, 14, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp(&t), "2026-01-14T12:00:00.000000Z");
    }

    #[test]
    fn test_token_id_format() {
        let t = Utc.with_ymd_and_hms(2026, 1, 14, 12, 0, 0).unwrap();
        let id = generate_token_id("tibet", &t);
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "tibet");
        assert_eq!(parts[1], "20260114120000000000");
        assert_eq!(parts[2].len(), 32);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));

        assert_ne!(generate_token_id("tibet", &t), id);
    }

    #[test]
    fn test_create_binds_actor_and_state() {
        let provider = provider();
        let token = provider
            .create("login", Payload::map([("user", "alice")]))
            .unwrap();

        assert_eq!(token.actor, "jis:test:provider");
        assert_eq!(token.state, TokenState::Created);
        assert!(token.token_id.as_str().starts_with("tibet_"));
        assert!(token.is_root());
        assert!(token.verify());
        assert_eq!(provider.get(&token.token_id).unwrap(), token);
        assert_eq!(provider.count().unwrap(), 1);
    }

    #[test]
    fn test_create_with_draft() {
        let provider = provider();
        let parent = provider.create("api_call", Payload::Null).unwrap();
        let token = provider
            .create_with(
                TokenDraft::new("api_call")
                    .erin(Payload::map([("endpoint", "/users"), ("method", "GET")]))
                    .add_ref("jis:humotica:user_service")
                    .eromheen(Payload::map([("ip", "192.168.1.1")]))
                    .erachter("Fetch user list for admin dashboard")
                    .parent(&parent.token_id),
            )
            .unwrap();

        assert_eq!(token.eraan, vec!["jis:humotica:user_service".to_string()]);
        assert_eq!(token.parent_id.as_ref(), Some(&parent.token_id));
        assert_eq!(token.erachter, "Fetch user list for admin dashboard");
        assert!(token.verify());
    }

    #[test]
    fn test_empty_action_rejected() {
        let provider = provider();
        let result = provider.create("", Payload::Null);
        assert!(matches!(result, Err(TibetError::Core(CoreError::InvalidToken(_)))));
        assert_eq!(provider.count().unwrap(), 0);
    }

    #[test]
    fn test_auto_chain() {
        let provider = Provider::new(
            ProviderConfig::new("jis:test").auto_chain(true),
            MemoryStore::new(),
        );
        let a = provider.create("a", Payload::Null).unwrap();
        let b = provider.create("b", Payload::Null).unwrap();
        let c = provider
            .create_with(TokenDraft::new("c").parent(&a.token_id))
            .unwrap();
        let d = provider.create("d", Payload::Null).unwrap();

        assert!(a.is_root());
        assert_eq!(b.parent_id.as_ref(), Some(&a.token_id));
        assert_eq!(c.parent_id.as_ref(), Some(&a.token_id));
        assert_eq!(d.parent_id.as_ref(), Some(&c.token_id));
    }

    #[test]
    fn test_no_auto_chain_by_default() {
        let provider = provider();
        provider.create("a", Payload::Null).unwrap();
        let b = provider.create("b", Payload::Null).unwrap();
        assert!(b.is_root());
    }

    #[test]
    fn test_providers_share_store_not_state() {
        let store = Arc::new(MemoryStore::new());
        let alice = Provider::new(
            ProviderConfig::new("jis:alice").auto_chain(true),
            Arc::clone(&store),
        );
        let bob = Provider::new(
            ProviderConfig::new("jis:bob").auto_chain(true),
            Arc::clone(&store),
        );

        let a1 = alice.create("x", Payload::Null).unwrap();
        let b1 = bob.create("x", Payload::Null).unwrap();
        let a2 = alice.create("x", Payload::Null).unwrap();

        assert!(b1.is_root());
        assert_eq!(a2.parent_id.as_ref(), Some(&a1.token_id));
        assert_eq!(b1.actor, "jis:bob");
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_advance_state_walks_lifecycle() {
        let provider = provider();
        let incident = provider.create("incident", Payload::Null).unwrap();

        let mut current = incident.clone();
        for expected in &TokenState::ALL[1..] {
            let next = provider.advance_state(&current.token_id, "").unwrap();
            assert_eq!(next.state, *expected);
            assert_eq!(next.action, STATE_CHANGE_ACTION);
            assert_eq!(next.parent_id.as_ref(), Some(&current.token_id));
            assert_eq!(next.eraan, vec![current.token_id.to_string()]);
            assert_eq!(
                next.erin.get("old_state").and_then(Payload::as_str),
                Some(current.state.as_str())
            );
            assert_eq!(
                next.erin.get("new_state").and_then(Payload::as_str),
                Some(expected.as_str())
            );
            current = next;
        }

        let result = provider.advance_state(&current.token_id, "again");
        assert!(matches!(
            result,
            Err(TibetError::Core(CoreError::InvalidTransition {
                from: TokenState::Resolved,
                ..
            }))
        ));

        // The original is never rewritten.
        assert_eq!(provider.get(&incident.token_id).unwrap(), incident);
        assert_eq!(provider.count().unwrap(), 5);
    }

    #[test]
    fn test_advance_state_refuses_to_branch() {
        let provider = provider();
        let t = provider.create("incident", Payload::Null).unwrap();
        let first = provider.advance_state(&t.token_id, "").unwrap();

        let again = provider.advance_state(&t.token_id, "");
        assert!(matches!(
            again,
            Err(TibetError::AlreadyAdvanced { ref token_id, ref successor })
                if token_id == &t.token_id && successor == &first.token_id
        ));
        let explicit = provider.transition(&t.token_id, TokenState::Detected, "");
        assert!(matches!(explicit, Err(TibetError::AlreadyAdvanced { .. })));

        assert_eq!(provider.count().unwrap(), 2);
        assert_eq!(provider.successor(&t.token_id).unwrap(), Some(first.clone()));
        assert_eq!(provider.successor(&first.token_id).unwrap(), None);

        // The lifecycle continues from the newest token.
        let next = provider.advance_state(&first.token_id, "").unwrap();
        assert_eq!(next.state, TokenState::Classified);
    }

    #[test]
    fn test_plain_children_do_not_block_advance() {
        let provider = provider();
        let t = provider.create("incident", Payload::Null).unwrap();
        provider
            .create_with(TokenDraft::new("comment").parent(&t.token_id))
            .unwrap();

        let next = provider.advance_state(&t.token_id, "").unwrap();
        assert_eq!(next.state, TokenState::Detected);
    }

    #[test]
    fn test_on_token_sees_every_persisted_token() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let provider = provider().on_token(move |token| {
            sink.lock().unwrap().push(token.token_id.clone());
        });

        let a = provider.create("login", Payload::Null).unwrap();
        let b = provider.advance_state(&a.token_id, "").unwrap();
        assert!(provider.create("", Payload::Null).is_err());
        assert!(provider.advance_state(&a.token_id, "").is_err());

        assert_eq!(*seen.lock().unwrap(), vec![a.token_id, b.token_id]);
    }

    #[test]
    fn test_advance_state_reason() {
        let provider = provider();
        let t = provider.create("incident", Payload::Null).unwrap();

        let default = provider.advance_state(&t.token_id, "").unwrap();
        assert_eq!(default.erachter, "State change: created -> detected");

        let explicit = provider
            .advance_state(&default.token_id, "triaged by on-call")
            .unwrap();
        assert_eq!(explicit.erachter, "triaged by on-call");
    }

    #[test]
    fn test_transition_rejects_skips() {
        let provider = provider();
        let t = provider.create("incident", Payload::Null).unwrap();

        let result = provider.transition(&t.token_id, TokenState::Mitigated, "");
        assert!(matches!(
            result,
            Err(TibetError::Core(CoreError::InvalidTransition {
                from: TokenState::Created,
                to: TokenState::Mitigated,
            }))
        ));

        let ok = provider
            .transition(&t.token_id, TokenState::Detected, "")
            .unwrap();
        assert_eq!(ok.state, TokenState::Detected);
    }

    #[test]
    fn test_advance_state_missing_token() {
        let provider = provider();
        let result = provider.advance_state(&TokenId::new("nope"), "");
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_verify_all_and_export() {
        let provider = provider();
        let a = provider.create("a", Payload::map([("n", 1)])).unwrap();
        let b = provider.create("b", Payload::map([("n", 2)])).unwrap();

        let results = provider.verify_all().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.get_index(0), Some((&a.token_id, &true)));
        assert_eq!(results.get_index(1), Some((&b.token_id, &true)));

        let lines = provider.export(ExportFormat::JsonLines).unwrap();
        let parsed: Vec<Token> = lines
            .lines()
            .map(|line| Token::from_json(line).unwrap())
            .collect();
        assert_eq!(parsed, vec![a.clone(), b.clone()]);

        let json = provider.export(ExportFormat::Json).unwrap();
        let parsed: Vec<Token> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![a, b]);
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"actor": "jis:humotica:app"}"#).unwrap();
        assert_eq!(config, ProviderConfig::new("jis:humotica:app"));

        let config: ProviderConfig = serde_json::from_str(
            r#"{"actor": "jis:a", "id_prefix": "audit", "auto_chain": true}"#,
        )
        .unwrap();
        assert_eq!(config.id_prefix, "audit");
        assert!(config.auto_chain);
    }

    #[test]
    fn test_custom_prefix() {
        let provider = Provider::new(
            ProviderConfig::new("jis:a").id_prefix("audit"),
            MemoryStore::new(),
        );
        let token = provider.create("x", Payload::Null).unwrap();
        assert!(token.token_id.as_str().starts_with("audit_"));
    }
}
