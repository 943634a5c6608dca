//! Stable fingerprinting shared by query-pattern and plan signatures.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Canonical JSON (recursively sorted object keys) of `value`, hashed with
/// SHA-256 and truncated to 16 hex characters. Two distinct shapes hashing
/// to the same prefix is accepted as in the source this is grounded on —
/// no collision handling is added.
pub fn fingerprint(value: &impl Serialize) -> String {
    let json = serde_json::to_value(value).expect("fingerprint input must serialize");
    let canonical = canonicalize(&json).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// `serde_json` already serializes maps in a deterministic order only if
/// the underlying map is itself ordered; `Value::Object` is backed by a
/// `BTreeMap` when the `preserve_order` feature is off, which this crate
/// relies on for key-sorted canonical output.
fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
