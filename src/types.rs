//! Core identity types shared across the generator.

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte blake3 digest
pub type Hash = [u8; 32];

/// Stable identity of a source object.
///
/// Derived from the object's kind tag and qualified name, so the same object
/// keeps its identity across process restarts and model reloads.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StableId(Hash);

impl StableId {
    /// StableId = hash(kind_tag || ":" || qualified_name)
    pub fn derive(kind_tag: &str, qualified_name: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(kind_tag.as_bytes());
        hasher.update(b":");
        hasher.update(qualified_name.as_bytes());
        StableId(*hasher.finalize().as_bytes())
    }

    /// Identity of a time generation, scoped to its owning type.
    pub fn for_generation(owner_qualified_name: &str, valid_from: chrono::NaiveDate) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(b"generation:");
        hasher.update(owner_qualified_name.as_bytes());
        hasher.update(b":");
        hasher.update(valid_from.format("%Y-%m-%d").to_string().as_bytes());
        StableId(*hasher.finalize().as_bytes())
    }

    pub fn from_bytes(bytes: Hash) -> Self {
        StableId(bytes)
    }

    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StableId({})", self.short())
    }
}

/// Compute a content fingerprint for arbitrary bytes.
pub fn fingerprint(bytes: &[u8]) -> Hash {
    *blake3::hash(bytes).as_bytes()
}
