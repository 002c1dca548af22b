//! Canonical JSON encoding for content hashing
//!
//! Object keys are emitted sorted by their UTF-8 bytes at every depth, array
//! order is kept, and no insignificant whitespace is written. Two payloads
//! that differ only in key order therefore hash identically. Changing this
//! encoding changes every content hash and is a compatibility break.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::ContentHash;

/// Serialize `value` in canonical form
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&str, &Value> =
                map.iter().map(|(k, v)| (k.as_str(), v)).collect();
            out.push('{');
            for (i, (key, item)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_scalar(&Value::String(key.to_string()), out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        scalar => write_scalar(scalar, out),
    }
}

fn write_scalar(value: &Value, out: &mut String) {
    // Serializing a scalar Value cannot fail
    out.push_str(&value.to_string());
}

/// Content hash of a JSON payload: keccak-256 over its canonical encoding
pub fn payload_hash(value: &Value) -> ContentHash {
    ContentHash::keccak256(canonical_json(value).as_bytes())
}
