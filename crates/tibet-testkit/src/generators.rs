//! Proptest generators for property-based testing.

use proptest::prelude::*;

use tibet_core::{Payload, PayloadMap, Token, TokenBuilder, TokenId, TokenState};

/// Generate a map key.
pub fn key() -> impl Strategy<Value = String> {
    "[a-z_]{1,8}".prop_map(String::from)
}

/// Generate a finite float, including negative zero.
pub fn finite_float() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        Just(-0.0),
        (-1.0e12f64..1.0e12f64),
        any::<f64>().prop_filter("finite", |f| f.is_finite()),
    ]
}

/// Generate a scalar payload.
pub fn scalar() -> impl Strategy<Value = Payload> {
    prop_oneof![
        Just(Payload::Null),
        any::<bool>().prop_map(Payload::Bool),
        any::<i64>().prop_map(Payload::Integer),
        finite_float().prop_map(Payload::Float),
        ".{0,16}".prop_map(Payload::Text),
    ]
}

/// Generate an arbitrary payload, nested a few levels deep.
pub fn payload() -> impl Strategy<Value = Payload> {
    scalar().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Payload::List),
            prop::collection::btree_map(key(), inner, 0..6)
                .prop_map(|entries| Payload::Map(entries.into_iter().collect())),
        ]
    })
}

/// Generate a map payload.
pub fn payload_map() -> impl Strategy<Value = Payload> {
    prop::collection::btree_map(key(), payload(), 0..8)
        .prop_map(|entries| Payload::Map(entries.into_iter().collect()))
}

/// Generate a payload together with a copy whose maps were built in a
/// different insertion order at every level.
pub fn payload_with_reordering() -> impl Strategy<Value = (Payload, Payload)> {
    (payload_map(), any::<u64>()).prop_map(|(payload, seed)| {
        let reordered = reorder(&payload, seed);
        (payload, reordered)
    })
}

/// Rebuild every map in `payload` with its entries rotated by a
/// seed-derived amount and reversed, keeping all values.
pub fn reorder(payload: &Payload, seed: u64) -> Payload {
    match payload {
        Payload::List(items) => Payload::List(items.iter().map(|p| reorder(p, seed)).collect()),
        Payload::Map(map) => {
            let mut entries: Vec<(String, Payload)> = map
                .iter()
                .map(|(k, v)| (k.clone(), reorder(v, seed.rotate_left(7))))
                .collect();
            if !entries.is_empty() {
                let shift = (seed % entries.len() as u64) as usize;
                entries.rotate_left(shift);
            }
            entries.reverse();
            Payload::Map(entries.into_iter().collect::<PayloadMap>())
        }
        other => other.clone(),
    }
}

/// Generate a lifecycle state.
pub fn token_state() -> impl Strategy<Value = TokenState> {
    prop::sample::select(TokenState::ALL.to_vec())
}

/// Generate a timestamp in the fixed-width provider format.
pub fn timestamp() -> impl Strategy<Value = String> {
    (2020u32..2040, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60, 0u32..1_000_000).prop_map(
        |(y, mo, d, h, mi, s, us)| {
            format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}Z",
                y, mo, d, h, mi, s, us
            )
        },
    )
}

/// Generate an actor in the `domain:identifier` convention.
pub fn actor() -> impl Strategy<Value = String> {
    "jis:[a-z]{1,10}:[a-z_]{1,12}".prop_map(String::from)
}

/// Parameters for generating a token.
#[derive(Debug, Clone)]
pub struct TokenParams {
    pub token_id: String,
    pub action: String,
    pub timestamp: String,
    pub actor: String,
    pub erin: Payload,
    pub eraan: Vec<String>,
    pub eromheen: Payload,
    pub erachter: String,
    pub parent_id: Option<String>,
    pub state: TokenState,
}

impl Arbitrary for TokenParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            "tibet_[0-9]{20}_[0-9a-f]{32}",
            "[a-z_]{1,16}",
            timestamp(),
            actor(),
            payload(),
            prop::collection::vec("[a-z:_]{1,24}", 0..4),
            payload_map(),
            ".{0,40}",
            proptest::option::of("tibet_[0-9]{20}_[0-9a-f]{32}"),
            token_state(),
        )
            .prop_map(
                |(token_id, action, timestamp, actor, erin, eraan, eromheen, erachter, parent_id, state)| {
                    TokenParams {
                        token_id,
                        action,
                        timestamp,
                        actor,
                        erin,
                        eraan,
                        eromheen,
                        erachter,
                        parent_id,
                        state,
                    }
                },
            )
            .boxed()
    }
}

/// Build a token from parameters.
///
/// Generated parameters always satisfy validation, so this never fails for
/// values produced by the `Arbitrary` impl.
pub fn token_from_params(params: &TokenParams) -> Token {
    TokenBuilder::new(
        params.token_id.as_str(),
        params.action.as_str(),
        params.timestamp.as_str(),
        params.actor.as_str(),
    )
    .erin(params.erin.clone())
    .eraan(params.eraan.clone())
    .eromheen(params.eromheen.clone())
    .erachter(params.erachter.as_str())
    .parent_opt(params.parent_id.as_deref().map(TokenId::from))
    .state(params.state)
    .build()
    .unwrap_or_else(|e| panic!("generated params failed validation: {}", e))
}
