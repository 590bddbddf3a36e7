use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::value_objects::Fingerprint;

/// Compute a SHA-256 fingerprint of a value's JSON serialisation.
///
/// Algorithm:
/// 1. The value is converted to a `serde_json::Value`. Object keys end up in
///    a sorted map, so struct field order and map insertion order do not
///    affect the result.
/// 2. The value is serialised to a compact string and hashed with SHA-256.
///
/// A value that cannot be represented as JSON (e.g. a map with non-string
/// keys) hashes as `null`.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Fingerprint {
    let canonical = serde_json::to_value(value)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "null".to_string());
    let hash = Sha256::digest(canonical.as_bytes());
    Fingerprint(format!("{:x}", hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn same_value_same_fingerprint() {
        let v = json!({ "name": "Barn A", "propertySize": 10 });
        assert_eq!(fingerprint(&v), fingerprint(&v.clone()));
    }

    #[test]
    fn different_values_different_fingerprint() {
        let a = json!({ "name": "Barn A", "propertySize": 10 });
        let b = json!({ "name": "Barn A", "propertySize": 12 });
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn key_order_independent() {
        let mut first = HashMap::new();
        first.insert("a", 1);
        first.insert("b", 2);
        let mut second = HashMap::new();
        second.insert("b", 2);
        second.insert("a", 1);
        assert_eq!(fingerprint(&first), fingerprint(&second));
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = fingerprint(&json!(null));
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
