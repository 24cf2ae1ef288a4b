//! Create records from definition files

use colored::Colorize;
use conduit_fs::{ConfigStore, NormalizedPath};
use serde_json::Value;
use std::path::Path;

use super::print_json;
use crate::cli::RecordKind;
use crate::context::Context;
use crate::error::Result;

/// Run the create command
pub fn run_create(ctx: &Context, file: &Path, kind: RecordKind, json: bool) -> Result<()> {
    let input: Value = ConfigStore::new().load(&NormalizedPath::new(file))?;

    match kind {
        RecordKind::Synchronization => {
            let definition = ctx.store_admin().create_synchronization(input)?;
            if json {
                return print_json(&definition);
            }
            println!(
                "{} synchronization {} ({}) version {}",
                "Created".green().bold(),
                definition.id.to_string().cyan(),
                definition.name,
                definition.version
            );
        }
        RecordKind::Mapping => {
            let mapping = ctx.store_admin().create_mapping(input)?;
            if json {
                return print_json(&mapping);
            }
            println!(
                "{} mapping {} ({}) version {}",
                "Created".green().bold(),
                mapping.id.to_string().cyan(),
                mapping.name,
                mapping.version
            );
        }
    }
    Ok(())
}
