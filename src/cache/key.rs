//! Computation Keys
//!
//! Canonical identifiers for a cacheable (target, method, arguments) triple,
//! plus the keys derived from them for the interlock and completion signal.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Object segment used for class-level (non-instance) computations.
pub const NO_OBJECT: &str = ".";

/// Identifies one computation instance in the shared store.
///
/// Layout: `<target>/<object param or ".">/<method>[/<sha-256 of the arguments>]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComputationKey(String);

impl ComputationKey {
    /// Derives the key for `method` on `target`, optionally bound to one object.
    ///
    /// `%` and `/` inside a segment are percent-encoded, as is an object param
    /// of exactly `"."`, so every triple maps to a distinct key.
    pub fn derive(target: &str, object_param: Option<&str>, method: &str, args: &[Value]) -> Self {
        let target = escape_segment(target);
        let object = match object_param {
            None => NO_OBJECT.to_string(),
            Some(NO_OBJECT) => "%2E".to_string(),
            Some(object) => escape_segment(object),
        };
        let method = escape_segment(method);
        let key = match args_digest(args) {
            Some(digest) => format!("{target}/{object}/{method}/{digest}"),
            None => format!("{target}/{object}/{method}"),
        };
        Self(key)
    }

    /// Uses a caller-chosen key verbatim instead of deriving one.
    pub fn explicit(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the election lock for this computation.
    pub fn lock_key(&self) -> String {
        format!("{}/lock", self.0)
    }

    /// Key of the completion signal list for this computation.
    pub fn done_key(&self) -> String {
        format!("{}/done", self.0)
    }
}

impl fmt::Display for ComputationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ComputationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn escape_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace('/', "%2F")
}

/// Hex sha-256 of the canonical JSON form of `args`, `None` for no arguments.
///
/// Order matters and nulls are kept, so `[1, null]` and `[1]` differ.
pub fn args_digest(args: &[Value]) -> Option<String> {
    if args.is_empty() {
        return None;
    }
    let canonical = Value::Array(args.iter().map(canonicalize).collect());
    let digest = Sha256::digest(canonical.to_string().as_bytes());
    Some(hex::encode(digest))
}

/// Rebuilds objects with sorted keys so equal arguments always serialize identically.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(fields) => {
            let mut sorted: Vec<_> = fields.iter().collect();
            sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut map = Map::with_capacity(sorted.len());
            for (name, field) in sorted {
                map.insert(name.clone(), canonicalize(field));
            }
            Value::Object(map)
        }
        other => other.clone(),
    }
}
