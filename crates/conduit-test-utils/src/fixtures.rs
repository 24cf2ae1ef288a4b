//! Sample data shared by the test suites.

use serde_json::{Value, json};
use std::path::Path;

/// The canonical single-person source record.
pub fn john_doe() -> Value {
    json!({"id": 1, "name": "John Doe", "age": 30, "email": "john@example.com"})
}

/// Three people with origin ids `A`, `B` and `C`.
pub fn people_abc() -> Vec<(String, Value)> {
    [("A", "Ada", 36), ("B", "Bob", 41), ("C", "Cy", 29)]
        .into_iter()
        .map(|(id, name, age)| (id.to_string(), json!({"id": id, "name": name, "age": age})))
        .collect()
}

/// Mapping rules turning a person into `{fullName, userAge}`.
pub fn person_mapping() -> Value {
    json!({"fullName": "{{name}}", "userAge": "{{age}}"})
}

/// Admin request body for a `json_file` → `json_directory` synchronization.
pub fn json_file_definition(
    name: &str,
    source: &Path,
    target_dir: &Path,
    delete_old_targets: bool,
) -> Value {
    json!({
        "name": name,
        "sourceConfig": {"type": "json_file", "path": source.to_string_lossy()},
        "targetConfig": {
            "type": "json_directory",
            "path": target_dir.to_string_lossy(),
            "deleteOldTargets": delete_old_targets
        },
        "mapping": person_mapping()
    })
}
