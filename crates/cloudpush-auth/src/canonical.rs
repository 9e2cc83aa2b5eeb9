//! Deterministic payload encoding.
//!
//! An operation hash is computed over the bytes of a payload, so both sides
//! of a request must render the same logical payload to the same bytes:
//! - JSON object keys are sorted (via `serde_json::Value`, whose maps are
//!   ordered)
//! - output is compact, with no insignificant whitespace
//! - raw byte payloads are used verbatim
//!
//! The sender hashes the value it is about to send; the receiver hashes the
//! value it decoded. Any field that does not survive a decode/encode cycle
//! unchanged will break verification.

use serde::Serialize;

use crate::error::{AuthError, Result};

/// Something that renders to a canonical byte form for hashing.
pub trait Payload {
    /// The deterministic bytes representing this payload.
    fn deterministic_bytes(&self) -> Result<Vec<u8>>;
}

impl<P: Payload + ?Sized> Payload for &P {
    fn deterministic_bytes(&self) -> Result<Vec<u8>> {
        (**self).deterministic_bytes()
    }
}

/// A payload that is already a byte string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BytesPayload(pub Vec<u8>);

impl Payload for BytesPayload {
    fn deterministic_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}

impl From<Vec<u8>> for BytesPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for BytesPayload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// A JSON payload wrapper for any serializable value.
#[derive(Debug, Clone)]
pub struct JsonPayload<T>(pub T);

impl<T: Serialize> Payload for JsonPayload<T> {
    fn deterministic_bytes(&self) -> Result<Vec<u8>> {
        canonical_json(&self.0)
    }
}

/// Encode a value as canonical JSON.
///
/// The value goes through `serde_json::Value` first, which orders object
/// keys, so two maps with the same entries always encode identically
/// regardless of their in-memory ordering.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value).map_err(|e| AuthError::Encoding(e.to_string()))?;
    serde_json::to_vec(&value).map_err(|e| AuthError::Encoding(e.to_string()))
}

/// Standard base64 for byte fields, for use with `#[serde(with = ...)]`.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Sample {
        zeta: u32,
        alpha: HashMap<String, String>,
    }

    #[test]
    fn test_object_keys_sorted() {
        let mut alpha = HashMap::new();
        alpha.insert("b".to_string(), "y".to_string());
        alpha.insert("a".to_string(), "z".to_string());
        let bytes = canonical_json(&Sample { zeta: 1, alpha }).unwrap();
        assert_eq!(bytes, br#"{"alpha":{"a":"z","b":"y"},"zeta":1}"#.to_vec());
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for i in 0..32 {
            first.insert(format!("key-{i}"), i.to_string());
        }
        for i in (0..32).rev() {
            second.insert(format!("key-{i}"), i.to_string());
        }
        assert_eq!(
            JsonPayload(&first).deterministic_bytes().unwrap(),
            JsonPayload(&second).deterministic_bytes().unwrap()
        );
    }

    #[test]
    fn test_bytes_payload_verbatim() {
        let payload = BytesPayload::from(&b"{ \"not\":  canonical }"[..]);
        assert_eq!(
            payload.deterministic_bytes().unwrap(),
            b"{ \"not\":  canonical }".to_vec()
        );
    }

    #[test]
    fn test_unserializable_value_is_encoding_error() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1u8);
        let err = canonical_json(&map).unwrap_err();
        assert!(matches!(err, AuthError::Encoding(_)));
    }
}
