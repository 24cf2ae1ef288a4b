use chrono::{DateTime, Utc};
use conduit_mapping::MappingDefinition;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

/// Reference to a stored mapping by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MappingReference {
    pub mapping_id: i64,
}

/// Where a synchronization gets its mapping from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingSource {
    /// `{"mappingId": 3}`
    Reference(MappingReference),
    /// `{"rules": {...}, ...}`
    Embedded(MappingDefinition),
}

impl Default for MappingSource {
    fn default() -> Self {
        Self::Embedded(MappingDefinition::default())
    }
}

impl From<MappingDefinition> for MappingSource {
    fn from(definition: MappingDefinition) -> Self {
        Self::Embedded(definition)
    }
}

/// Configuration for one source → target synchronization task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizationDefinition {
    #[serde(default)]
    pub id: i64,
    pub uuid: Uuid,
    pub version: Version,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Adapter options; `type` selects the source adapter
    #[serde(default)]
    pub source_config: Map<String, Value>,
    /// Adapter options; `type` selects the target adapter
    #[serde(default)]
    pub target_config: Map<String, Value>,
    #[serde(default)]
    pub mapping: MappingSource,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl SynchronizationDefinition {
    /// Create an unsaved definition (id 0) with a fresh uuid and version `0.0.1`.
    pub fn new(
        name: impl Into<String>,
        source_config: Map<String, Value>,
        target_config: Map<String, Value>,
        mapping: impl Into<MappingSource>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            uuid: Uuid::new_v4(),
            version: super::initial_version(),
            name: name.into(),
            description: None,
            source_config,
            target_config,
            mapping: mapping.into(),
            created: now,
            updated: now,
        }
    }

    /// The registered source adapter type
    pub fn source_type(&self) -> Result<&str> {
        adapter_type(&self.source_config, "sourceConfig")
    }

    /// The registered target adapter type
    pub fn target_type(&self) -> Result<&str> {
        adapter_type(&self.target_config, "targetConfig")
    }

    /// Whether targets whose source object disappeared should be deleted
    pub fn delete_old_targets(&self) -> bool {
        self.target_config
            .get("deleteOldTargets")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

fn adapter_type<'a>(config: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    config
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidInput(format!("{field}.type is required")))
}
