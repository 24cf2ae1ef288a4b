//! List synchronizations and mappings

use colored::Colorize;
use conduit_core::{DefinitionStore, Filter, MappingStore};

use super::print_json;
use crate::context::Context;
use crate::error::Result;

/// Run the list command
pub fn run_list(ctx: &Context, search: Option<&str>, mappings: bool, json: bool) -> Result<()> {
    let filter = match search {
        Some(term) => Filter::all().search(term),
        None => Filter::all(),
    };

    if mappings {
        let records = ctx.store.find_mappings(&filter)?;
        if json {
            return print_json(&records);
        }
        println!("{}", "Mappings".bold());
        if records.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for record in records {
            println!(
                "  {:<5} {:<24} {}",
                record.id.to_string().cyan(),
                record.name,
                record.version.to_string().dimmed()
            );
        }
        return Ok(());
    }

    let definitions = ctx.store.find_definitions(&filter)?;
    if json {
        return print_json(&definitions);
    }
    println!("{}", "Synchronizations".bold());
    if definitions.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for definition in definitions {
        let route = format!(
            "{} -> {}",
            definition.source_type().unwrap_or("?"),
            definition.target_type().unwrap_or("?")
        );
        println!(
            "  {:<5} {:<24} {:<28} {}",
            definition.id.to_string().cyan(),
            definition.name,
            route,
            definition.version.to_string().dimmed()
        );
    }
    Ok(())
}
