//! Structured payloads for `erin` and `eromheen`.
//!
//! `Payload` is a closed variant type. Anything a caller wants to record
//! must be expressible as one of these variants, which keeps canonical
//! encoding total: the only runtime failure left is a non-finite float.
//!
//! Maps keep insertion order so records read naturally; the canonical
//! encoder sorts keys, so insertion order never reaches the hash.

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EncodingError;

/// Ordered mapping used by [`Payload::Map`].
pub type PayloadMap = IndexMap<String, Payload>;

/// A structured payload value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<Payload>),
    Map(PayloadMap),
}

impl Payload {
    /// An empty map, the default for `eromheen`.
    pub fn empty_map() -> Self {
        Payload::Map(PayloadMap::new())
    }

    /// Build a map from key/value pairs, keeping their order.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Payload>,
        I: IntoIterator<Item = (K, V)>,
    {
        Payload::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Convert any `Serialize` value through its JSON form.
    ///
    /// Fails for values JSON cannot carry, such as maps with non-string
    /// keys or non-finite floats.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, EncodingError> {
        let json =
            serde_json::to_value(value).map_err(|e| EncodingError::Unsupported(e.to_string()))?;
        Self::from_json(json)
    }

    /// Convert a JSON value.
    pub fn from_json(value: serde_json::Value) -> Result<Self, EncodingError> {
        use serde_json::Value;

        Ok(match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Payload::Integer(i)
                } else if n.is_u64() {
                    return Err(EncodingError::IntegerOutOfRange(n.to_string()));
                } else {
                    match n.as_f64() {
                        Some(f) => Payload::Float(f),
                        None => return Err(EncodingError::Unsupported(n.to_string())),
                    }
                }
            }
            Value::String(s) => Payload::Text(s),
            Value::Array(items) => Payload::List(
                items
                    .into_iter()
                    .map(Self::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => Payload::Map(
                map.into_iter()
                    .map(|(k, v)| Ok((k, Self::from_json(v)?)))
                    .collect::<Result<_, EncodingError>>()?,
            ),
        })
    }

    /// Convert into a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value, EncodingError> {
        use serde_json::Value;

        Ok(match self {
            Payload::Null => Value::Null,
            Payload::Bool(b) => Value::Bool(*b),
            Payload::Integer(i) => Value::Number((*i).into()),
            Payload::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .ok_or(EncodingError::NonFiniteFloat(*f))?,
            Payload::Text(s) => Value::String(s.clone()),
            Payload::List(items) => Value::Array(
                items
                    .iter()
                    .map(Payload::to_json)
                    .collect::<Result<_, _>>()?,
            ),
            Payload::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
                    .collect::<Result<_, EncodingError>>()?,
            ),
        })
    }

    /// Look up a key when this payload is a map.
    pub fn get(&self, key: &str) -> Option<&Payload> {
        match self {
            Payload::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// The text value, if this payload is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for `Null` and for empty lists and maps.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Null => true,
            Payload::List(items) => items.is_empty(),
            Payload::Map(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Payload::from_json(json).map_err(D::Error::custom)
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::Bool(b)
    }
}

impl From<i64> for Payload {
    fn from(i: i64) -> Self {
        Payload::Integer(i)
    }
}

impl From<i32> for Payload {
    fn from(i: i32) -> Self {
        Payload::Integer(i.into())
    }
}

impl From<u32> for Payload {
    fn from(i: u32) -> Self {
        Payload::Integer(i.into())
    }
}

impl From<f64> for Payload {
    fn from(f: f64) -> Self {
        Payload::Float(f)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl<T: Into<Payload>> From<Vec<T>> for Payload {
    fn from(items: Vec<T>) -> Self {
        Payload::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map_or(Payload::Null, Into::into)
    }
}

impl From<PayloadMap> for Payload {
    fn from(map: PayloadMap) -> Self {
        Payload::Map(map)
    }
}

impl TryFrom<serde_json::Value> for Payload {
    type Error = EncodingError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Payload::from_json(value)
    }
}
