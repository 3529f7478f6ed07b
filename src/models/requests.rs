//! Request DTOs for the store server API
//!
//! Keys travel as query parameters because computation keys contain `/`.
//! Values and list items travel as raw request bodies.

use serde::{Deserialize, Serialize};

use crate::store::MAX_KEY_LENGTH;

/// Returns an error message if `key` cannot be stored, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Query for `GET /kv` and `DELETE /kv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyQuery {
    pub key: String,
}

/// Query for `PUT /kv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetQuery {
    /// The key to write
    pub key: String,
    /// Optional TTL in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
    /// Only write when the key is absent
    #[serde(default)]
    pub nx: bool,
}

/// Query for `POST /kv/expire`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpireQuery {
    pub key: String,
    pub ttl_ms: u64,
}

/// Query for `POST /list/push`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushQuery {
    pub key: String,
    /// TTL re-applied to the whole list after the push
    pub ttl_ms: u64,
}

/// Query for `POST /list/pop`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopQuery {
    pub key: String,
    /// How long to wait for an item; absent or zero waits indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_query_defaults() {
        let query: SetQuery = serde_json::from_str(r#"{"key": "test"}"#).unwrap();
        assert_eq!(query.key, "test");
        assert!(query.ttl_ms.is_none());
        assert!(!query.nx);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("").is_some());
        assert!(validate_key(&"x".repeat(MAX_KEY_LENGTH + 1)).is_some());
        assert!(validate_key("Report/./total/lock").is_none());
    }
}
