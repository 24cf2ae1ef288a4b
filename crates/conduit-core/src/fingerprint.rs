//! Content fingerprints for change detection
//!
//! A fingerprint covers both the source payload and the mapping, so editing
//! a mapping re-syncs every object on the next run.

use conduit_fs::compute_content_checksum;
use serde_json::{Map, Value, json};

use crate::Result;

/// Rebuild `value` with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical_json(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_json).collect()),
        other => other.clone(),
    }
}

/// Checksum of a value's canonical JSON text
pub fn checksum(value: &Value) -> Result<String> {
    let text = serde_json::to_string(&canonical_json(value))?;
    Ok(compute_content_checksum(&text))
}

/// Fingerprint of one source object under a mapping
pub fn fingerprint(payload: &Value, mapping: &Value) -> Result<String> {
    checksum(&json!({"payload": payload, "mapping": mapping}))
}
