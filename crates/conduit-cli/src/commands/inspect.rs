//! Job logs and contracts of a synchronization

use chrono::Utc;
use colored::Colorize;
use conduit_core::{ContractStatus, ContractStore, JobLogStore, LogLevel};

use super::print_json;
use crate::context::Context;
use crate::error::Result;

/// Run the logs command
pub fn run_logs(ctx: &Context, id: i64, json: bool) -> Result<()> {
    let logs = ctx.store.logs_for_synchronization(id)?;
    if json {
        return print_json(&logs);
    }

    println!("{} for synchronization {}", "Job logs".bold(), id.to_string().cyan());
    if logs.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for log in logs {
        let level = match log.level {
            LogLevel::Info => "INFO   ".green(),
            LogLevel::Warning => "WARNING".yellow(),
            LogLevel::Error => "ERROR  ".red(),
        };
        println!(
            "  {} {} {}",
            log.created.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            level,
            log.message
        );
    }
    Ok(())
}

/// Run the contracts command
pub fn run_contracts(ctx: &Context, id: i64, json: bool) -> Result<()> {
    let contracts = ctx.store.find_by_synchronization(id)?;
    if json {
        return print_json(&contracts);
    }

    println!("{} for synchronization {}", "Contracts".bold(), id.to_string().cyan());
    if contracts.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for contract in contracts {
        let status = match contract.status {
            ContractStatus::Synced => "synced ".green(),
            ContractStatus::Pending => "pending".yellow(),
            ContractStatus::Failed => "failed ".red(),
        };
        println!(
            "  {:<5} {} {:<20} -> {}",
            contract.id.to_string().cyan(),
            status,
            contract.origin_id,
            contract.target_id.as_deref().unwrap_or("-")
        );
        if let Some(error) = contract.last_error {
            println!("        {}", error.red());
        }
    }
    Ok(())
}

/// Run the purge-logs command
pub fn run_purge_logs(ctx: &Context) -> Result<()> {
    let purged = ctx.store.purge_expired(Utc::now())?;
    println!("{} {purged} expired job log(s)", "Purged".green().bold());
    Ok(())
}
