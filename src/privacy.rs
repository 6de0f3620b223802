//! Address anonymization and sensitive-field redaction.
//!
//! Level semantics (monotonically more aggressive):
//! 1 = identity, 2 = mask last component, 3 = salted-hash remap into a
//! fixed private range, 4 = mask last two components, 5 = collapse to a
//! constant loopback address.

use once_cell::sync::Lazy;
use rand::RngCore;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Placeholder written over redacted field values.
pub const REDACTED: &str = "[FILTERED]";

/// Marker substituted for masked address components.
const MASKED: &str = "xxx";

/// Constant output of full (level 5) anonymization.
const LOOPBACK: &str = "127.0.0.1";

/// Salt generated once per process lifetime. A fresh salt per run breaks
/// cross-run correlation of level-3 remapped addresses on purpose.
static RUN_SALT: Lazy<[u8; 16]> = Lazy::new(|| {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
});

/// Pure address anonymizer: output depends only on (address, level, salt).
#[derive(Debug, Clone)]
pub struct Anonymizer {
    level: u8,
    salt: [u8; 16],
}

impl Anonymizer {
    /// Build an anonymizer at the given level using the run-scoped salt.
    pub fn new(level: u8) -> Self {
        Self {
            level,
            salt: *RUN_SALT,
        }
    }

    /// Fixed-salt constructor for deterministic tests.
    #[cfg(test)]
    pub fn with_salt(level: u8, salt: [u8; 16]) -> Self {
        Self { level, salt }
    }

    /// Apply the configured anonymization level to an address string.
    pub fn anonymize(&self, address: &str) -> String {
        match self.level {
            0 | 1 => address.to_string(),
            2 => mask_last_components(address, 1),
            3 => self.hash_remap(address),
            4 => mask_last_components(address, 2),
            _ => LOOPBACK.to_string(),
        }
    }

    /// Deterministic salted remap into 192.168.0.0/16. Same address and
    /// salt always produce the same output.
    fn hash_remap(&self, address: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(address.as_bytes());
        hasher.update(self.salt);
        let digest = hasher.finalize();
        format!("192.168.{}.{}", digest[0], digest[1])
    }
}

/// Mask the trailing `n` components of a dotted (IPv4) or colon-separated
/// (IPv6) address. Addresses with no recognizable separator are left alone.
fn mask_last_components(address: &str, n: usize) -> String {
    let sep = if address.contains('.') {
        '.'
    } else if address.contains(':') {
        ':'
    } else {
        return address.to_string();
    };

    let mut parts: Vec<&str> = address.split(sep).collect();
    let len = parts.len();
    for part in parts.iter_mut().skip(len.saturating_sub(n)) {
        *part = MASKED;
    }
    parts.join(&sep.to_string())
}

/// Replace every top-level field named in `sensitive` with the redaction
/// placeholder. Independent of the anonymization level.
pub fn redact(mut record: Value, sensitive: &[String]) -> Value {
    if let Value::Object(ref mut map) = record {
        for field in sensitive {
            if let Some(slot) = map.get_mut(field) {
                *slot = Value::String(REDACTED.to_string());
            }
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SALT: [u8; 16] = [7u8; 16];

    #[test]
    fn test_level_1_is_identity() {
        let a = Anonymizer::with_salt(1, SALT);
        assert_eq!(a.anonymize("10.0.0.42"), "10.0.0.42");
    }

    #[test]
    fn test_level_2_masks_last_octet() {
        let a = Anonymizer::with_salt(2, SALT);
        assert_eq!(a.anonymize("192.168.0.17"), "192.168.0.xxx");
    }

    #[test]
    fn test_level_3_is_deterministic_and_private() {
        let a = Anonymizer::with_salt(3, SALT);
        let first = a.anonymize("8.8.8.8");
        let second = a.anonymize("8.8.8.8");
        assert_eq!(first, second);
        assert!(first.starts_with("192.168."));
        // A different address should (for this salt) land elsewhere.
        assert_ne!(first, a.anonymize("8.8.4.4"));
    }

    #[test]
    fn test_level_3_salt_changes_mapping() {
        let a = Anonymizer::with_salt(3, SALT);
        let b = Anonymizer::with_salt(3, [9u8; 16]);
        assert_ne!(a.anonymize("8.8.8.8"), b.anonymize("8.8.8.8"));
    }

    #[test]
    fn test_level_4_masks_last_two_octets() {
        let a = Anonymizer::with_salt(4, SALT);
        assert_eq!(a.anonymize("172.16.4.9"), "172.16.xxx.xxx");
    }

    #[test]
    fn test_level_5_is_constant() {
        let a = Anonymizer::with_salt(5, SALT);
        assert_eq!(a.anonymize("1.2.3.4"), LOOPBACK);
        assert_eq!(a.anonymize("fe80::1"), LOOPBACK);
        assert_eq!(a.anonymize("anything"), LOOPBACK);
    }

    #[test]
    fn test_ipv6_masking() {
        let a = Anonymizer::with_salt(2, SALT);
        assert_eq!(a.anonymize("fe80::abcd:1"), "fe80::abcd:xxx");
    }

    #[test]
    fn test_redact_replaces_listed_fields() {
        let sensitive = vec!["username".to_string(), "email".to_string()];
        let record = json!({
            "username": "alice",
            "email": "alice@example.com",
            "bytes": 1024,
        });
        let redacted = redact(record, &sensitive);
        assert_eq!(redacted["username"], REDACTED);
        assert_eq!(redacted["email"], REDACTED);
        assert_eq!(redacted["bytes"], 1024);
    }

    #[test]
    fn test_redact_ignores_missing_fields() {
        let sensitive = vec!["ssn".to_string()];
        let record = json!({ "protocol": "TCP" });
        let redacted = redact(record, &sensitive);
        assert_eq!(redacted["protocol"], "TCP");
    }
}
