//! Evaluate a mapping without running a synchronization

use conduit_fs::{ConfigStore, NormalizedPath};
use conduit_mapping::MappingDefinition;
use serde_json::Value;
use std::path::Path;

use super::print_json;
use crate::error::Result;

/// Run the map command, printing the mapped object as JSON
pub fn run_map(mapping: &Path, input: &Path) -> Result<()> {
    let store = ConfigStore::new();
    let definition = MappingDefinition::from_value(store.load(&NormalizedPath::new(mapping))?)?;
    let input: Value = store.load(&NormalizedPath::new(input))?;

    let output = conduit_mapping::map(&definition, &input)?;
    print_json(&output)
}
