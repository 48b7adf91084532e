//! Canonical JSON encoding and content hashing.
//!
//! Two semantically equal documents must produce identical digests no
//! matter what field insertion order was used to build them. Object keys
//! are sorted before encoding, arrays keep their order, and scalars are
//! written with serde_json's standard formatting. The digest is used purely
//! as an equality oracle between local and server state, never for storage
//! addressing.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::document::Document;

/// Domain prefix folded into every content hash.
const HASH_DOMAIN: &[u8] = b"docsync-content-v0:";

/// A blake3 digest of a document's canonical encoding.
///
/// Travels on the wire as a lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Lowercase hex rendering, as exchanged with the store.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| D::Error::custom("invalid content hash"))
    }
}

/// Compute the canonical content hash of a document.
///
/// Pure function; no side effects.
pub fn content_hash(document: &Document) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(HASH_DOMAIN);
    hasher.update(&canonical_bytes(document.as_value()));
    ContentHash(*hasher.finalize().as_bytes())
}

/// Canonical JSON bytes for a value: sorted object keys, no insignificant
/// whitespace.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    write_value(&mut buf, value);
    buf
}

fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_value(buf, item);
            }
            buf.push(b']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            buf.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_scalar(buf, &Value::String(key.clone()));
                buf.push(b':');
                write_value(buf, &map[key]);
            }
            buf.push(b'}');
        }
        scalar => write_scalar(buf, scalar),
    }
}

fn write_scalar(buf: &mut Vec<u8>, scalar: &Value) {
    serde_json::to_writer(&mut *buf, scalar).expect("serialization should not fail");
}
