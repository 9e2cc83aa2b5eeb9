//! Symmetric MAC keys and the registry that holds them.
//!
//! Keys are shared between an application and the control plane. Several
//! keys can be live at once during rotation: the newest (highest id) signs,
//! and all of them verify.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{AuthError, Result};

/// A MAC key for authenticating requests between an application and the
/// control plane.
///
/// Serializes as `{"kid": .., "data": ..}` with `data` in standard base64.
/// It contains secret material, so take care where it ends up.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Ordinal of this key. Higher ids are newer.
    #[serde(rename = "kid")]
    pub id: u32,
    /// Secret key bytes.
    #[serde(rename = "data", with = "crate::canonical::base64_bytes")]
    secret: Vec<u8>,
}

impl Key {
    /// Create a key from an id and secret bytes.
    pub fn new(id: u32, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            secret: secret.into(),
        }
    }

    /// Generate a key with 32 random secret bytes.
    pub fn generate(id: u32) -> Self {
        let mut secret = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self { id, secret }
    }

    /// The secret key bytes.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(kid={}, <redacted>)", self.id)
    }
}

/// An immutable set of keys.
///
/// Cloning is cheap; all clones share the same key list. Lookups never take
/// a lock.
#[derive(Clone)]
pub struct KeyRegistry {
    keys: Arc<[Key]>,
    latest: Option<usize>,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self {
            keys: Arc::from(Vec::new()),
            latest: None,
        }
    }
}

impl KeyRegistry {
    /// Build a registry from a list of keys.
    ///
    /// Fails if two keys share an id.
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Result<Self> {
        let keys: Vec<Key> = keys.into_iter().collect();

        let mut latest: Option<usize> = None;
        for (idx, key) in keys.iter().enumerate() {
            if keys[..idx].iter().any(|k| k.id == key.id) {
                return Err(AuthError::DuplicateKeyId(key.id));
            }
            match latest {
                Some(l) if keys[l].id >= key.id => {}
                _ => latest = Some(idx),
            }
        }

        Ok(Self {
            keys: keys.into(),
            latest,
        })
    }

    /// A registry holding a single key.
    pub fn single(key: Key) -> Self {
        Self {
            keys: Arc::from(vec![key]),
            latest: Some(0),
        }
    }

    /// The key with the highest id, used for signing.
    pub fn latest(&self) -> Option<&Key> {
        self.latest.map(|idx| &self.keys[idx])
    }

    /// Look up a key by id.
    pub fn get(&self, id: u32) -> Option<&Key> {
        self.keys.iter().find(|k| k.id == id)
    }

    /// All keys in the registry, in the order they were configured.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<u32> = self.keys.iter().map(|k| k.id).collect();
        f.debug_struct("KeyRegistry")
            .field("kids", &ids)
            .field("latest", &self.latest().map(|k| k.id))
            .finish()
    }
}
