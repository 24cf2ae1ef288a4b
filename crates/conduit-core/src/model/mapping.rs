use chrono::{DateTime, Utc};
use conduit_mapping::MappingDefinition;
use semver::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A mapping stored on its own and referenced by definitions via `mappingId`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRecord {
    #[serde(default)]
    pub id: i64,
    pub uuid: Uuid,
    pub version: Version,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub mapping: MappingDefinition,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl MappingRecord {
    pub fn new(name: impl Into<String>, mapping: MappingDefinition) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            uuid: Uuid::new_v4(),
            version: super::initial_version(),
            name: name.into(),
            description: None,
            mapping,
            created: now,
            updated: now,
        }
    }
}
