//! Operation hashes: the fingerprint a request signature is bound to.

use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::canonical::Payload;
use crate::error::Result;

/// BLAKE3 derive-key context for operation hashes.
pub const OPERATION_HASH_CONTEXT: &str = "cloudpush 2024 operation hash v1";

/// The kind of object an operation acts on.
///
/// Only ever mixed into the hash; never sent on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// A pub/sub message.
    PubsubMsg,
}

impl ObjectType {
    pub const fn tag(self) -> &'static str {
        match self {
            ObjectType::PubsubMsg => "pubsub-msg",
        }
    }
}

/// What the operation does to its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Create,
    Read,
}

impl ActionType {
    pub const fn tag(self) -> &'static str {
        match self {
            ActionType::Create => "create",
            ActionType::Read => "read",
        }
    }
}

/// A fingerprint of (object, action, payload, context).
///
/// Held as the hex string carried in the `op=` parameter of the
/// Authorization header. On the receiving side it is whatever the peer sent,
/// so it is never parsed, only compared.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHash(String);

impl OperationHash {
    /// Hash an operation.
    ///
    /// Every element is length-prefixed, so no two distinct input tuples
    /// produce the same hasher input.
    pub fn new(
        object: ObjectType,
        action: ActionType,
        payload: &dyn Payload,
        context: &[&[u8]],
    ) -> Result<Self> {
        let payload_bytes = payload.deterministic_bytes()?;

        let mut hasher = blake3::Hasher::new_derive_key(OPERATION_HASH_CONTEXT);
        update_framed(&mut hasher, object.tag().as_bytes());
        update_framed(&mut hasher, action.tag().as_bytes());
        update_framed(&mut hasher, &payload_bytes);
        for ctx in context {
            update_framed(&mut hasher, ctx);
        }

        Ok(Self(hex::encode(hasher.finalize().as_bytes())))
    }

    /// Wrap a hash string taken from a header.
    pub fn from_wire(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recompute the hash for the given operation and compare it to this one
    /// in constant time.
    pub fn verify(
        &self,
        object: ObjectType,
        action: ActionType,
        payload: &dyn Payload,
        context: &[&[u8]],
    ) -> Result<bool> {
        let expected = Self::new(object, action, payload, context)?;
        Ok(self.ct_eq(&expected))
    }

    /// Constant-time equality.
    pub fn ct_eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

fn update_framed(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

impl fmt::Debug for OperationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..16).unwrap_or(&self.0);
        write!(f, "OperationHash({})", short)
    }
}

impl fmt::Display for OperationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OperationHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{BytesPayload, JsonPayload};
    use std::collections::HashMap;

    fn payload() -> BytesPayload {
        BytesPayload(br#"{"id":7}"#.to_vec())
    }

    #[test]
    fn test_hash_deterministic() {
        let h1 = OperationHash::new(ObjectType::PubsubMsg, ActionType::Read, &payload(), &[b"sub"]).unwrap();
        let h2 = OperationHash::new(ObjectType::PubsubMsg, ActionType::Read, &payload(), &[b"sub"]).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.as_str().len(), 64);
    }

    #[test]
    fn test_action_separates_domain() {
        let read = OperationHash::new(ObjectType::PubsubMsg, ActionType::Read, &payload(), &[]).unwrap();
        let create = OperationHash::new(ObjectType::PubsubMsg, ActionType::Create, &payload(), &[]).unwrap();
        assert_ne!(read, create);
    }

    #[test]
    fn test_context_separates_domain() {
        let orders = OperationHash::new(ObjectType::PubsubMsg, ActionType::Create, &payload(), &[b"orders"]).unwrap();
        let refunds = OperationHash::new(ObjectType::PubsubMsg, ActionType::Create, &payload(), &[b"refunds"]).unwrap();
        let none = OperationHash::new(ObjectType::PubsubMsg, ActionType::Create, &payload(), &[]).unwrap();
        assert_ne!(orders, refunds);
        assert_ne!(orders, none);
    }

    #[test]
    fn test_framing_prevents_boundary_shift() {
        // "ab" + "c" must not collide with "a" + "bc".
        let h1 = OperationHash::new(ObjectType::PubsubMsg, ActionType::Read, &payload(), &[b"ab", b"c"]).unwrap();
        let h2 = OperationHash::new(ObjectType::PubsubMsg, ActionType::Read, &payload(), &[b"a", b"bc"]).unwrap();
        assert_ne!(h1, h2);

        let h3 = OperationHash::new(
            ObjectType::PubsubMsg,
            ActionType::Read,
            &BytesPayload(b"xsub".to_vec()),
            &[b"" as &[u8]],
        )
        .unwrap();
        let h4 = OperationHash::new(ObjectType::PubsubMsg, ActionType::Read, &BytesPayload(b"x".to_vec()), &[b"sub"]).unwrap();
        assert_ne!(h3, h4);
    }

    #[test]
    fn test_map_reordering_stable() {
        let mut a = HashMap::new();
        a.insert("z", "1");
        a.insert("y", "2");
        let mut b = HashMap::new();
        b.insert("y", "2");
        b.insert("z", "1");

        let h1 = OperationHash::new(ObjectType::PubsubMsg, ActionType::Create, &JsonPayload(&a), &[]).unwrap();
        let h2 = OperationHash::new(ObjectType::PubsubMsg, ActionType::Create, &JsonPayload(&b), &[]).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_verify() {
        let h = OperationHash::new(ObjectType::PubsubMsg, ActionType::Read, &payload(), &[b"sub"]).unwrap();
        assert!(h.verify(ObjectType::PubsubMsg, ActionType::Read, &payload(), &[b"sub"]).unwrap());
        assert!(!h.verify(ObjectType::PubsubMsg, ActionType::Read, &payload(), &[b"other"]).unwrap());

        let tampered = BytesPayload(br#"{"id":8}"#.to_vec());
        assert!(!h.verify(ObjectType::PubsubMsg, ActionType::Read, &tampered, &[b"sub"]).unwrap());
    }

    #[test]
    fn test_wire_value_compared_not_parsed() {
        let h = OperationHash::from_wire("not-hex-at-all");
        assert!(!h.verify(ObjectType::PubsubMsg, ActionType::Read, &payload(), &[]).unwrap());
        assert_eq!(format!("{:?}", h), "OperationHash(not-hex-at-all)");
    }
}
