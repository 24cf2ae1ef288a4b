use conduit_fs::{NormalizedPath, io};
use serde_json::Value;
use std::fs;
use uuid::Uuid;

use super::{AdapterConfig, CallContext, TargetAdapter, required_str};
use crate::{Error, Result};

/// Target storing each object as `<path>/<targetId>.json`
///
/// New objects get a random uuid as target id; updates overwrite the file of
/// the existing id. Deleting an id whose file is already gone succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDirectoryTarget;

impl JsonDirectoryTarget {
    pub const TYPE: &'static str = "json_directory";

    fn object_path(config: &AdapterConfig, target_id: &str) -> Result<NormalizedPath> {
        let valid = !target_id.is_empty()
            && target_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !target_id.starts_with('.');
        if !valid {
            return Err(Error::TargetRejected(format!(
                "invalid target id '{target_id}'"
            )));
        }
        Ok(NormalizedPath::new(required_str(config, "path")?).join(&format!("{target_id}.json")))
    }
}

impl TargetAdapter for JsonDirectoryTarget {
    fn write(
        &self,
        config: &AdapterConfig,
        payload: &Value,
        existing_target_id: Option<&str>,
        ctx: &CallContext,
    ) -> Result<String> {
        ctx.check("json_directory write")?;
        if !payload.is_object() {
            return Err(Error::TargetRejected("payload must be a JSON object".into()));
        }

        let target_id = existing_target_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let path = Self::object_path(config, &target_id)?;
        let content = serde_json::to_string_pretty(payload)?;

        io::write_text(&path, &content).map_err(|e| Error::TargetUnavailable(e.to_string()))?;
        tracing::trace!(path = %path, "Wrote target object");
        Ok(target_id)
    }

    fn delete(&self, config: &AdapterConfig, target_id: &str, ctx: &CallContext) -> Result<()> {
        ctx.check("json_directory delete")?;
        let path = Self::object_path(config, target_id)?;
        match fs::remove_file(path.to_native()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::TargetUnavailable(format!("{path}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn config(dir: &std::path::Path) -> AdapterConfig {
        json!({"type": "json_directory", "path": dir.to_string_lossy()})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn ctx() -> CallContext {
        CallContext::new(Duration::from_secs(5))
    }

    #[test]
    fn test_write_update_delete() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let id = JsonDirectoryTarget
            .write(&config, &json!({"v": 1}), None, &ctx())
            .unwrap();
        let file = dir.path().join(format!("{id}.json"));
        assert!(file.exists());

        let same = JsonDirectoryTarget
            .write(&config, &json!({"v": 2}), Some(&id), &ctx())
            .unwrap();
        assert_eq!(same, id);
        let stored: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(stored, json!({"v": 2}));

        JsonDirectoryTarget.delete(&config, &id, &ctx()).unwrap();
        assert!(!file.exists());
        JsonDirectoryTarget.delete(&config, &id, &ctx()).unwrap();
    }

    #[test]
    fn test_rejects_path_traversal_ids() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonDirectoryTarget
            .write(&config(dir.path()), &json!({}), Some("../escape"), &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::TargetRejected(_)));
    }

    #[test]
    fn test_rejects_non_object_payload() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonDirectoryTarget
            .write(&config(dir.path()), &json!([1]), None, &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::TargetRejected(_)));
    }
}
