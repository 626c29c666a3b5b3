//! Golden test vectors for deterministic verification.
//!
//! Each vector fixes every hashed field of a token together with the
//! canonical CBOR bytes and BLAKE3 content hash it must produce. Any
//! implementation of the token format has to reproduce these exactly.

use tibet_core::{
    canonical_token_bytes, CoreError, Payload, Token, TokenBuilder, TokenId, TokenState,
};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// What the vector exercises.
    pub description: &'static str,
    pub token_id: &'static str,
    pub action: &'static str,
    pub timestamp: &'static str,
    pub actor: &'static str,
    /// `erin` as JSON.
    pub erin: &'static str,
    pub eraan: &'static [&'static str],
    /// `eromheen` as JSON.
    pub eromheen: &'static str,
    pub erachter: &'static str,
    pub parent_id: Option<&'static str>,
    pub state: TokenState,
    /// Expected canonical encoding (hex).
    pub expected_canonical: &'static str,
    /// Expected content hash (hex).
    pub expected_hash: &'static str,
}

const ROOT_ID: &str = "tibet_20260114120000000000_00000000000000000000000000000000";

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "minimal",
            description: "Root token with null content and empty context",
            token_id: ROOT_ID,
            action: "login",
            timestamp: "2026-01-14T12:00:00.000000Z",
            actor: "jis:humotica:app",
            erin: "null",
            eraan: &[],
            eromheen: "{}",
            erachter: "",
            parent_id: None,
            state: TokenState::Created,
            expected_canonical: concat!(
                "aa66616374696f6e656c6f67696e656163746f72706a69733a68756d6f746963613a6170",
                "7065657261616e8068657261636874657260646572696ef66865726f6d6865656ea06970",
                "6172656e745f6964f665737461746567637265617465646974696d657374616d70781b32",
                "3032362d30312d31345431323a30303a30302e3030303030305a68746f6b656e5f696478",
                "3b74696265745f32303236303131343132303030303030303030305f3030303030303030",
                "303030303030303030303030303030303030303030303030",
            ),
            expected_hash: "a8a42dbba7a177a858dab1470de6a9233f6e8d6380d5be2522890dd8f13dfeb7",
        },
        GoldenVector {
            name: "full_provenance",
            description: "All four provenance dimensions populated",
            token_id: "tibet_20260114120001000000_0123456789abcdef0123456789abcdef",
            action: "api_call",
            timestamp: "2026-01-14T12:00:01.000000Z",
            actor: "jis:humotica:app",
            erin: r#"{"method": "GET", "endpoint": "/users"}"#,
            eraan: &["jis:humotica:user_service"],
            eromheen: r#"{"session": "abc123", "ip": "192.168.1.1"}"#,
            erachter: "Fetch user list for admin dashboard",
            parent_id: None,
            state: TokenState::Created,
            expected_canonical: concat!(
                "aa66616374696f6e686170695f63616c6c656163746f72706a69733a68756d6f74696361",
                "3a61707065657261616e8178196a69733a68756d6f746963613a757365725f7365727669",
                "6365686572616368746572782346657463682075736572206c69737420666f722061646d",
                "696e2064617368626f617264646572696ea268656e64706f696e74662f7573657273666d",
                "6574686f64634745546865726f6d6865656ea26269706b3139322e3136382e312e316773",
                "657373696f6e6661626331323369706172656e745f6964f6657374617465676372656174",
                "65646974696d657374616d70781b323032362d30312d31345431323a30303a30312e3030",
                "303030305a68746f6b656e5f6964783b74696265745f3230323630313134313230303031",
                "3030303030305f3031323334353637383961626364656630313233343536373839616263",
                "646566",
            ),
            expected_hash: "9be9e66aaf02bc42b98471cc4a440925d06399afd7fc3caee0f8df7b53a0d91c",
        },
        GoldenVector {
            name: "state_change",
            description: "Lifecycle token linked to its parent",
            token_id: "tibet_20260114120002000000_ffffffffffffffffffffffffffffffff",
            action: "state_change",
            timestamp: "2026-01-14T12:00:02.000000Z",
            actor: "jis:humotica:app",
            erin: r#"{"token_id": "tibet_20260114120000000000_00000000000000000000000000000000", "old_state": "created", "new_state": "detected"}"#,
            eraan: &[ROOT_ID],
            eromheen: "{}",
            erachter: "State change: created -> detected",
            parent_id: Some(ROOT_ID),
            state: TokenState::Detected,
            expected_canonical: concat!(
                "aa66616374696f6e6c73746174655f6368616e6765656163746f72706a69733a68756d6f",
                "746963613a61707065657261616e81783b74696265745f32303236303131343132303030",
                "303030303030305f30303030303030303030303030303030303030303030303030303030",
                "3030303068657261636874657278215374617465206368616e67653a2063726561746564",
                "202d3e206465746563746564646572696ea3696e65775f73746174656864657465637465",
                "64696f6c645f7374617465676372656174656468746f6b656e5f6964783b74696265745f",
                "32303236303131343132303030303030303030305f303030303030303030303030303030",
                "30303030303030303030303030303030306865726f6d6865656ea069706172656e745f69",
                "64783b74696265745f32303236303131343132303030303030303030305f303030303030",
                "303030303030303030303030303030303030303030303030303065737461746568646574",
                "65637465646974696d657374616d70781b323032362d30312d31345431323a30303a3032",
                "2e3030303030305a68746f6b656e5f6964783b74696265745f3230323630313134313230",
                "3030323030303030305f6666666666666666666666666666666666666666666666666666",
                "666666666666",
            ),
            expected_hash: "a1fa214490a3d3df28a86d4e405cc911ed4770de73fe35312ec0e819628c1a63",
        },
        GoldenVector {
            name: "numbers_and_nesting",
            description: "Floats, negative zero, integers, nested maps, non-ASCII actor",
            token_id: "vector-4",
            action: "measure",
            timestamp: "2026-01-14T12:00:00.000000Z",
            actor: "jis:gemeente:zaandam:\u{eb}",
            erin: r#"{"scores": [1.5, -0.0, 0, -500, 1000000], "nested": {"z": null, "a": true, "m": false}}"#,
            eraan: &[],
            eromheen: r#"{"b": 1, "aa": 2}"#,
            erachter: "",
            parent_id: None,
            state: TokenState::Resolved,
            expected_canonical: concat!(
                "aa66616374696f6e676d656173757265656163746f72776a69733a67656d65656e74653a",
                "7a61616e64616d3ac3ab65657261616e8068657261636874657260646572696ea2666e65",
                "73746564a36161f5616df4617af66673636f72657385fb3ff8000000000000fb00000000",
                "00000000003901f31a000f42406865726f6d6865656ea26261610261620169706172656e",
                "745f6964f6657374617465687265736f6c7665646974696d657374616d70781b32303236",
                "2d30312d31345431323a30303a30302e3030303030305a68746f6b656e5f696468766563",
                "746f722d34",
            ),
            expected_hash: "cfb2c18525feb5bd23e2586520ccb7797800bd40b56b3ba90cdcfc33d0c6a21b",
        },
        GoldenVector {
            name: "empty_parent",
            description: "Empty-string parent, distinct from an absent parent",
            token_id: "vector-5",
            action: "login",
            timestamp: "2026-01-14T12:00:00.000000Z",
            actor: "jis:humotica:app",
            erin: "null",
            eraan: &[],
            eromheen: "{}",
            erachter: "",
            parent_id: Some(""),
            state: TokenState::Created,
            expected_canonical: concat!(
                "aa66616374696f6e656c6f67696e656163746f72706a69733a68756d6f746963613a6170",
                "7065657261616e8068657261636874657260646572696ef66865726f6d6865656ea06970",
                "6172656e745f69646065737461746567637265617465646974696d657374616d70781b32",
                "3032362d30312d31345431323a30303a30302e3030303030305a68746f6b656e5f696468",
                "766563746f722d35",
            ),
            expected_hash: "76f6a3b12ea146d7acf787c3dcdf330b86154d2b4d89cda8e418ffb03dfcd242",
        },
    ]
}

/// Build the token described by a golden vector.
pub fn token_from_vector(vector: &GoldenVector) -> Result<Token, CoreError> {
    let erin = Payload::from_json(serde_json::from_str(vector.erin)?)?;
    let eromheen = Payload::from_json(serde_json::from_str(vector.eromheen)?)?;

    TokenBuilder::new(vector.token_id, vector.action, vector.timestamp, vector.actor)
        .erin(erin)
        .eraan(vector.eraan.iter().map(|r| r.to_string()).collect())
        .eromheen(eromheen)
        .erachter(vector.erachter)
        .parent_opt(vector.parent_id.map(TokenId::from))
        .state(vector.state)
        .build()
}

/// Check every vector, reporting `(name, matches, computed hash)`.
///
/// Call this to verify your implementation matches the reference.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| match token_from_vector(v) {
            Ok(token) => {
                let canonical = canonical_token_bytes(&token).map(hex::encode);
                let matches = canonical.as_deref() == Ok(v.expected_canonical)
                    && token.content_hash.as_str() == v.expected_hash;
                (v.name.to_string(), matches, token.content_hash.to_string())
            }
            Err(e) => (v.name.to_string(), false, e.to_string()),
        })
        .collect()
}
