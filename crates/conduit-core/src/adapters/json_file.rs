use conduit_fs::{NormalizedPath, io};
use conduit_mapping::get_json_path;
use serde_json::Value;

use super::{AdapterConfig, CallContext, SourceAdapter, SourceObject, SourceObjects, required_str};
use crate::{Error, Result};

/// Source reading a JSON array of objects from a file
///
/// Options: `path` (required) and `idField` (dot-path to the origin id,
/// default `id`). String and number ids are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileSource;

impl JsonFileSource {
    pub const TYPE: &'static str = "json_file";
}

impl SourceAdapter for JsonFileSource {
    fn fetch(&self, config: &AdapterConfig, ctx: &CallContext) -> Result<SourceObjects> {
        ctx.check("json_file fetch")?;
        let path = NormalizedPath::new(required_str(config, "path")?);
        let id_field = config
            .get("idField")
            .and_then(Value::as_str)
            .unwrap_or("id")
            .to_string();

        let content = io::read_text(&path)
            .map_err(|e| Error::SourceUnavailable(e.to_string()))?;
        let items = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                return Err(Error::SourceUnavailable(format!(
                    "{path} does not contain a JSON array"
                )));
            }
            Err(e) => return Err(Error::SourceUnavailable(format!("{path}: {e}"))),
        };
        tracing::debug!(path = %path, count = items.len(), "Read source file");

        Ok(Box::new(items.into_iter().enumerate().map(
            move |(index, item)| {
                let origin_id = match get_json_path(&item, &id_field) {
                    Some(Value::String(id)) if !id.is_empty() => id.clone(),
                    Some(Value::Number(id)) => id.to_string(),
                    _ => {
                        return Err(Error::SourceUnavailable(format!(
                            "item {index} has no usable '{id_field}'"
                        )));
                    }
                };
                Ok(SourceObject::new(origin_id, item))
            },
        )))
    }
}
