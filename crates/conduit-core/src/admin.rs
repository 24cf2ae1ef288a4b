//! Administrative create/update/delete of definitions and mappings
//!
//! Input arrives as loose JSON. Keys starting with `_` and the server-managed
//! `id`, `created` and `updated` keys are dropped; any other unknown key is
//! rejected. Creation assigns a uuid (unless one is supplied) and version
//! `0.0.1`; every update increments the patch version.

use chrono::Utc;
use conduit_mapping::{CompiledMapping, MappingDefinition};
use semver::Version;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::filter::Filter;
use crate::model::{
    MappingRecord, MappingReference, MappingSource, SynchronizationDefinition, bump_patch,
    initial_version,
};
use crate::store::{ContractStore, DefinitionStore, MappingStore};
use crate::{Error, Result};

const SERVER_MANAGED: [&str; 3] = ["id", "created", "updated"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DefinitionInput {
    uuid: Option<Uuid>,
    version: Option<Version>,
    name: Option<String>,
    description: Option<String>,
    source_config: Option<Map<String, Value>>,
    target_config: Option<Map<String, Value>>,
    mapping: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MappingInput {
    uuid: Option<Uuid>,
    version: Option<Version>,
    name: Option<String>,
    description: Option<String>,
    mapping: Option<Value>,
}

/// Strip ignored keys and decode the rest strictly.
fn decode_input<T: DeserializeOwned>(input: Value) -> Result<T> {
    let Value::Object(mut object) = input else {
        return Err(Error::InvalidInput("request body must be a JSON object".into()));
    };
    object.retain(|key, _| !key.starts_with('_') && !SERVER_MANAGED.contains(&key.as_str()));
    serde_json::from_value(Value::Object(object)).map_err(|e| Error::InvalidInput(e.to_string()))
}

fn required_name(name: Option<String>) -> Result<String> {
    match name {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(Error::InvalidInput("name is required".into())),
    }
}

/// Compile once so malformed templates are rejected at write time.
fn checked_mapping(value: Value) -> Result<MappingDefinition> {
    let mapping =
        MappingDefinition::from_value(value).map_err(|e| Error::InvalidInput(e.to_string()))?;
    CompiledMapping::compile(&mapping).map_err(|e| Error::InvalidInput(e.to_string()))?;
    Ok(mapping)
}

/// Create, update and delete definitions and mappings with integrity checks
pub struct AdminService {
    definitions: Arc<dyn DefinitionStore>,
    mappings: Arc<dyn MappingStore>,
    contracts: Arc<dyn ContractStore>,
}

impl AdminService {
    pub fn new(
        definitions: Arc<dyn DefinitionStore>,
        mappings: Arc<dyn MappingStore>,
        contracts: Arc<dyn ContractStore>,
    ) -> Self {
        Self {
            definitions,
            mappings,
            contracts,
        }
    }

    fn mapping_source(&self, value: Value) -> Result<MappingSource> {
        if value.get("mappingId").is_some() {
            let reference: MappingReference =
                serde_json::from_value(value).map_err(|e| Error::InvalidInput(e.to_string()))?;
            if self.mappings.find_mapping(reference.mapping_id)?.is_none() {
                return Err(Error::InvalidInput(format!(
                    "Mapping {} does not exist",
                    reference.mapping_id
                )));
            }
            return Ok(MappingSource::Reference(reference));
        }
        checked_mapping(value).map(MappingSource::Embedded)
    }

    pub fn create_synchronization(&self, input: Value) -> Result<SynchronizationDefinition> {
        let input: DefinitionInput = decode_input(input)?;
        let mapping = match input.mapping {
            Some(value) => self.mapping_source(value)?,
            None => MappingSource::default(),
        };

        let mut definition = SynchronizationDefinition::new(
            required_name(input.name)?,
            input.source_config.unwrap_or_default(),
            input.target_config.unwrap_or_default(),
            mapping,
        );
        definition.description = input.description;
        if let Some(uuid) = input.uuid {
            definition.uuid = uuid;
        }
        definition.version = input.version.unwrap_or_else(initial_version);

        let stored = self.definitions.insert_definition(definition)?;
        tracing::info!(id = stored.id, name = %stored.name, "Created synchronization");
        Ok(stored)
    }

    pub fn update_synchronization(&self, id: i64, input: Value) -> Result<SynchronizationDefinition> {
        let input: DefinitionInput = decode_input(input)?;
        let mut definition = self
            .definitions
            .find_definition(id)?
            .ok_or_else(|| Error::NotFound(format!("Synchronization {id}")))?;

        if let Some(name) = input.name {
            definition.name = required_name(Some(name))?;
        }
        if let Some(description) = input.description {
            definition.description = Some(description);
        }
        if let Some(uuid) = input.uuid {
            definition.uuid = uuid;
        }
        if let Some(source_config) = input.source_config {
            definition.source_config = source_config;
        }
        if let Some(target_config) = input.target_config {
            definition.target_config = target_config;
        }
        if let Some(mapping) = input.mapping {
            definition.mapping = self.mapping_source(mapping)?;
        }
        definition.version = bump_patch(input.version.as_ref().unwrap_or(&definition.version));
        definition.updated = Utc::now();

        let stored = self.definitions.update_definition(definition)?;
        tracing::info!(id, version = %stored.version, "Updated synchronization");
        Ok(stored)
    }

    /// Delete a definition that no contract references.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for unknown ids, [`Error::Conflict`] while
    /// contracts exist.
    pub fn delete_synchronization(&self, id: i64) -> Result<()> {
        if self.definitions.find_definition(id)?.is_none() {
            return Err(Error::NotFound(format!("Synchronization {id}")));
        }
        let contracts = self.contracts.count_for_synchronization(id)?;
        if contracts > 0 {
            return Err(Error::Conflict(format!(
                "Synchronization {id} still has {contracts} contract(s)"
            )));
        }
        self.definitions.delete_definition(id)?;
        tracing::info!(id, "Deleted synchronization");
        Ok(())
    }

    pub fn create_mapping(&self, input: Value) -> Result<MappingRecord> {
        let input: MappingInput = decode_input(input)?;
        let mapping = match input.mapping {
            Some(value) => checked_mapping(value)?,
            None => MappingDefinition::default(),
        };

        let mut record = MappingRecord::new(required_name(input.name)?, mapping);
        record.description = input.description;
        if let Some(uuid) = input.uuid {
            record.uuid = uuid;
        }
        record.version = input.version.unwrap_or_else(initial_version);

        let stored = self.mappings.insert_mapping(record)?;
        tracing::info!(id = stored.id, name = %stored.name, "Created mapping");
        Ok(stored)
    }

    pub fn update_mapping(&self, id: i64, input: Value) -> Result<MappingRecord> {
        let input: MappingInput = decode_input(input)?;
        let mut record = self
            .mappings
            .find_mapping(id)?
            .ok_or_else(|| Error::NotFound(format!("Mapping {id}")))?;

        if let Some(name) = input.name {
            record.name = required_name(Some(name))?;
        }
        if let Some(description) = input.description {
            record.description = Some(description);
        }
        if let Some(uuid) = input.uuid {
            record.uuid = uuid;
        }
        if let Some(mapping) = input.mapping {
            record.mapping = checked_mapping(mapping)?;
        }
        record.version = bump_patch(input.version.as_ref().unwrap_or(&record.version));
        record.updated = Utc::now();

        self.mappings.update_mapping(record)
    }

    /// Delete a mapping no definition references.
    pub fn delete_mapping(&self, id: i64) -> Result<()> {
        if self.mappings.find_mapping(id)?.is_none() {
            return Err(Error::NotFound(format!("Mapping {id}")));
        }
        let referencing: Vec<i64> = self
            .definitions
            .find_definitions(&Filter::all())?
            .into_iter()
            .filter(|d| {
                matches!(d.mapping, MappingSource::Reference(r) if r.mapping_id == id)
            })
            .map(|d| d.id)
            .collect();
        if !referencing.is_empty() {
            return Err(Error::Conflict(format!(
                "Mapping {id} is used by synchronization(s) {referencing:?}"
            )));
        }
        self.mappings.delete_mapping(id)?;
        Ok(())
    }
}
