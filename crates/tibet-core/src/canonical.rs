//! Canonical CBOR encoding for deterministic token hashing.
//!
//! Tokens are encoded as a CBOR map (RFC 8949) under these rules:
//! - Map keys are text, sorted lexicographically by their UTF-8 bytes,
//!   recursively through every nested payload map
//! - Integers use the smallest valid encoding
//! - Lengths are definite only
//! - Floats are always IEEE 754 binary64, with `-0.0` folded into `0.0`
//! - Non-finite floats are rejected
//! - An absent `parent_id` is `null`, never the empty string
//!
//! The canonical encoding is the hash input: the same logical token must
//! produce identical bytes however its payload maps were assembled.

use ciborium::value::{Integer, Value};

use crate::error::EncodingError;
use crate::payload::Payload;
use crate::token::Token;

/// Token field keys.
mod keys {
    pub const TOKEN_ID: &str = "token_id";
    pub const ACTION: &str = "action";
    pub const TIMESTAMP: &str = "timestamp";
    pub const ACTOR: &str = "actor";
    pub const ERIN: &str = "erin";
    pub const ERAAN: &str = "eraan";
    pub const EROMHEEN: &str = "eromheen";
    pub const ERACHTER: &str = "erachter";
    pub const PARENT_ID: &str = "parent_id";
    pub const STATE: &str = "state";
}

/// Encode the ten hashed fields of a token (everything but
/// `content_hash`) to canonical CBOR bytes.
pub fn canonical_token_bytes(token: &Token) -> Result<Vec<u8>, EncodingError> {
    let value = token_to_cbor_value(token)?;
    encode_cbor_value_canonical(&value)
}

/// Encode a single payload to canonical CBOR bytes.
pub fn canonical_payload_bytes(payload: &Payload) -> Result<Vec<u8>, EncodingError> {
    let value = payload_to_cbor_value(payload)?;
    encode_cbor_value_canonical(&value)
}

/// Convert a token to a CBOR Value (map with text keys).
fn token_to_cbor_value(token: &Token) -> Result<Value, EncodingError> {
    let parent = match &token.parent_id {
        Some(id) => Value::Text(id.as_str().to_string()),
        None => Value::Null,
    };

    let eraan = token
        .eraan
        .iter()
        .map(|r| Value::Text(r.clone()))
        .collect();

    // Entry order here is irrelevant; the encoder sorts keys.
    let entries = vec![
        text_entry(keys::TOKEN_ID, token.token_id.as_str()),
        text_entry(keys::ACTION, &token.action),
        text_entry(keys::TIMESTAMP, &token.timestamp),
        text_entry(keys::ACTOR, &token.actor),
        (Value::Text(keys::ERIN.into()), payload_to_cbor_value(&token.erin)?),
        (Value::Text(keys::ERAAN.into()), Value::Array(eraan)),
        (
            Value::Text(keys::EROMHEEN.into()),
            payload_to_cbor_value(&token.eromheen)?,
        ),
        text_entry(keys::ERACHTER, &token.erachter),
        (Value::Text(keys::PARENT_ID.into()), parent),
        text_entry(keys::STATE, token.state.as_str()),
    ];

    Ok(Value::Map(entries))
}

fn text_entry(key: &str, value: &str) -> (Value, Value) {
    (Value::Text(key.to_string()), Value::Text(value.to_string()))
}

/// Convert a payload to a CBOR Value.
fn payload_to_cbor_value(payload: &Payload) -> Result<Value, EncodingError> {
    Ok(match payload {
        Payload::Null => Value::Null,
        Payload::Bool(b) => Value::Bool(*b),
        Payload::Integer(i) => Value::Integer((*i).into()),
        Payload::Float(f) => {
            if !f.is_finite() {
                return Err(EncodingError::NonFiniteFloat(*f));
            }
            Value::Float(*f)
        }
        Payload::Text(s) => Value::Text(s.clone()),
        Payload::List(items) => Value::Array(
            items
                .iter()
                .map(payload_to_cbor_value)
                .collect::<Result<_, _>>()?,
        ),
        Payload::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| Ok((Value::Text(k.clone()), payload_to_cbor_value(v)?)))
                .collect::<Result<_, EncodingError>>()?,
        ),
    })
}

/// Encode a CBOR Value to canonical bytes.
fn encode_cbor_value_canonical(value: &Value) -> Result<Vec<u8>, EncodingError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), EncodingError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr)?,
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Float(f) => encode_float(buf, *f)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        other => {
            return Err(EncodingError::Unsupported(format!(
                "CBOR value has no canonical form: {:?}",
                other
            )))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a float as binary64 (major type 7, additional info 27).
fn encode_float(buf: &mut Vec<u8>, f: f64) -> Result<(), EncodingError> {
    if !f.is_finite() {
        return Err(EncodingError::NonFiniteFloat(f));
    }
    let f = if f == 0.0 { 0.0 } else { f };
    buf.push(0xfb);
    buf.extend_from_slice(&f.to_bits().to_be_bytes());
    Ok(())
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<(), EncodingError> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Encode a map canonically (major type 5).
///
/// Keys must be text and are sorted by their raw UTF-8 bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), EncodingError> {
    let mut pairs: Vec<(&str, &Value)> = entries
        .iter()
        .map(|(k, v)| match k {
            Value::Text(key) => Ok((key.as_str(), v)),
            other => Err(EncodingError::Unsupported(format!(
                "map key must be text, got {:?}",
                other
            ))),
        })
        .collect::<Result<_, _>>()?;

    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    for window in pairs.windows(2) {
        if window[0].0 == window[1].0 {
            return Err(EncodingError::Unsupported(format!(
                "duplicate map key: {}",
                window[0].0
            )));
        }
    }

    encode_uint(buf, 5, pairs.len() as u64);
    for (key, value) in pairs {
        encode_text(buf, key);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadMap;
    use crate::state::TokenState;
    use crate::token::TokenBuilder;

    fn sample_token(erin: Payload) -> Token {
        TokenBuilder::new("tibet_test_1", "login", "2026-01-14T12:00:00.000000Z", "jis:test:app")
            .erin(erin)
            .eraan(vec!["jis:test:user".to_string()])
            .erachter("user authentication")
            .build()
            .unwrap()
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let token = sample_token(Payload::map([("user", "alice")]));
        let b1 = canonical_token_bytes(&token).unwrap();
        let b2 = canonical_token_bytes(&token).unwrap();
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        // 0-23: single byte
        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        // 24-255: two bytes
        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        // 256-65535: three bytes
        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        // negatives
        buf.clear();
        encode_integer(&mut buf, (-1i64).into());
        assert_eq!(buf, vec![0x20]);

        buf.clear();
        encode_integer(&mut buf, (-500i64).into());
        assert_eq!(buf, vec![0x39, 0x01, 0xf3]);
    }

    #[test]
    fn test_map_keys_sorted_lexicographically() {
        // "b" < "aa" under length-first CBOR ordering, but here
        // ordering is plain lexicographic, so "aa" comes first.
        let payload = Payload::map([("b", 1), ("aa", 2)]);
        let bytes = canonical_payload_bytes(&payload).unwrap();
        assert_eq!(
            bytes,
            vec![0xa2, 0x62, b'a', b'a', 0x02, 0x61, b'b', 0x01]
        );
    }

    #[test]
    fn test_nested_map_order_does_not_matter() {
        let mut inner_a = PayloadMap::new();
        inner_a.insert("z".into(), Payload::Integer(1));
        inner_a.insert("a".into(), Payload::Integer(2));
        let mut inner_b = PayloadMap::new();
        inner_b.insert("a".into(), Payload::Integer(2));
        inner_b.insert("z".into(), Payload::Integer(1));

        let a = Payload::map([("outer", Payload::Map(inner_a)), ("k", "v".into())]);
        let b = Payload::map([("k", Payload::from("v")), ("outer", Payload::Map(inner_b))]);

        assert_eq!(
            canonical_payload_bytes(&a).unwrap(),
            canonical_payload_bytes(&b).unwrap()
        );
        assert_eq!(
            canonical_token_bytes(&sample_token(a)).unwrap(),
            canonical_token_bytes(&sample_token(b)).unwrap()
        );
    }

    #[test]
    fn test_float_encoding() {
        let bytes = canonical_payload_bytes(&Payload::Float(1.5)).unwrap();
        assert_eq!(bytes, vec![0xfb, 0x3f, 0xf8, 0, 0, 0, 0, 0, 0]);

        let pos = canonical_payload_bytes(&Payload::Float(0.0)).unwrap();
        let neg = canonical_payload_bytes(&Payload::Float(-0.0)).unwrap();
        assert_eq!(pos, neg);

        // Integer and float stay distinct.
        let int = canonical_payload_bytes(&Payload::Integer(1)).unwrap();
        let float = canonical_payload_bytes(&Payload::Float(1.0)).unwrap();
        assert_ne!(int, float);
    }

    #[test]
    fn test_non_finite_float_rejected() {
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let payload = Payload::List(vec![Payload::Integer(1), Payload::Float(f)]);
            assert!(matches!(
                canonical_payload_bytes(&payload),
                Err(EncodingError::NonFiniteFloat(_))
            ));
        }
    }

    #[test]
    fn test_absent_parent_distinct_from_empty_string() {
        let none = sample_token(Payload::Null);
        let mut empty = none.clone();
        empty.parent_id = Some("".into());

        assert_ne!(
            canonical_token_bytes(&none).unwrap(),
            canonical_token_bytes(&empty).unwrap()
        );
    }

    #[test]
    fn test_content_hash_excluded() {
        let token = sample_token(Payload::Null);
        let mut other = token.clone();
        other.content_hash = crate::crypto::ContentHash::from_hex("00");
        assert_eq!(
            canonical_token_bytes(&token).unwrap(),
            canonical_token_bytes(&other).unwrap()
        );
    }

    #[test]
    fn test_state_is_part_of_encoding() {
        let token = sample_token(Payload::Null);
        let mut other = token.clone();
        other.state = TokenState::Detected;
        assert_ne!(
            canonical_token_bytes(&token).unwrap(),
            canonical_token_bytes(&other).unwrap()
        );
    }

    #[test]
    fn test_output_is_valid_cbor() {
        let token = sample_token(Payload::map([
            ("n", Payload::Integer(-7)),
            ("f", Payload::Float(2.25)),
            ("l", Payload::from(vec!["x", "y"])),
        ]));
        let bytes = canonical_token_bytes(&token).unwrap();
        let value: Value = ciborium::from_reader(&bytes[..]).unwrap();

        let map = match value {
            Value::Map(m) => m,
            other => panic!("expected map, got {:?}", other),
        };
        let keys: Vec<String> = map
            .iter()
            .map(|(k, _)| k.as_text().unwrap().to_string())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 10);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn decode(bytes: &[u8]) -> Value {
            ciborium::from_reader(bytes).unwrap()
        }

        proptest! {
            #[test]
            fn integers_decode_to_same_value(n in any::<i64>()) {
                let bytes = canonical_payload_bytes(&Payload::Integer(n)).unwrap();
                let decoded: i128 = match decode(&bytes) {
                    Value::Integer(i) => i.into(),
                    other => panic!("expected integer, got {:?}", other),
                };
                prop_assert_eq!(decoded, n as i128);
            }

            #[test]
            fn finite_floats_are_nine_bytes(f in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
                let bytes = canonical_payload_bytes(&Payload::Float(f)).unwrap();
                prop_assert_eq!(bytes.len(), 9);
                prop_assert_eq!(bytes[0], 0xfb);
                match decode(&bytes) {
                    Value::Float(back) => prop_assert_eq!(back, if f == 0.0 { 0.0 } else { f }),
                    other => panic!("expected float, got {:?}", other),
                }
            }

            #[test]
            fn text_decodes_to_same_string(s in ".{0,64}") {
                let bytes = canonical_payload_bytes(&Payload::Text(s.clone())).unwrap();
                prop_assert_eq!(decode(&bytes), Value::Text(s));
            }

            #[test]
            fn map_keys_always_sorted(keys in prop::collection::hash_set("[a-zA-Z0-9_]{1,6}", 0..12)) {
                let payload = Payload::map(keys.iter().map(|k| (k.as_str(), Payload::Null)));
                let bytes = canonical_payload_bytes(&payload).unwrap();
                let decoded: Vec<String> = match decode(&bytes) {
                    Value::Map(entries) => entries
                        .into_iter()
                        .map(|(k, _)| k.into_text().unwrap())
                        .collect(),
                    other => panic!("expected map, got {:?}", other),
                };
                let mut expected: Vec<String> = keys.into_iter().collect();
                expected.sort();
                prop_assert_eq!(decoded, expected);
            }
        }
    }
}
