//! Canonical serialization and content checksums for module contracts.
//!
//! The canonical form is compact JSON with every object's keys sorted, so the
//! checksum only changes when the compiled contract changes.

use collectforge_common::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Rebuild `value` with object keys inserted in sorted order at every level.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serialize `value` into its canonical JSON text.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let tree = serde_json::to_value(value)
        .map_err(|e| Error::internal(format!("contract is not serializable: {e}")))?;
    serde_json::to_string(&canonicalize(tree))
        .map_err(|e| Error::internal(format!("contract is not serializable: {e}")))
}

/// Hex-encoded SHA-256 of the canonical form of `value`.
pub fn checksum<T: Serialize>(value: &T) -> Result<String> {
    let canonical = canonical_json(value)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_form_sorts_keys_recursively() {
        let value = json!({"b": 1, "a": {"z": true, "m": [ {"y": 1, "x": 2} ]}});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"a":{"m":[{"x":2,"y":1}],"z":true},"b":1}"#
        );
    }

    #[test]
    fn unserializable_value_is_an_internal_error() {
        let value = std::collections::BTreeMap::from([((1u8, 2u8), "tuple key")]);
        let err = checksum(&value).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert!(err.issues().is_empty());
    }

    #[test]
    fn array_order_is_significant() {
        assert_ne!(
            checksum(&json!({"a": [1, 2]})).unwrap(),
            checksum(&json!({"a": [2, 1]})).unwrap()
        );
    }

    #[test]
    fn checksum_is_hex_sha256() {
        let sum = checksum(&json!({"key": "books"})).unwrap();
        assert_eq!(sum.len(), 64);
        assert!(sum.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sum, checksum(&json!({"key": "books"})).unwrap());
    }
}
