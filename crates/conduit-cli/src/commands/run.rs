//! Run or test a synchronization

use colored::Colorize;
use conduit_core::{JobLog, JobLogStore, LogLevel, RunTrace, SynchronizationAction};
use serde_json::{Value, json};

use super::print_json;
use crate::context::Context;
use crate::error::{CliError, Result};

fn arguments(id: &str, contract: Option<&str>) -> Value {
    let mut arguments = json!({ "synchronizationId": id });
    if let Some(contract) = contract {
        arguments["synchronizationContractId"] = Value::String(contract.to_string());
    }
    arguments
}

fn record(ctx: &Context, trace: &RunTrace, job_class: &str) -> Result<()> {
    let log = JobLog::from_trace(trace, job_class, ctx.settings.log_retention());
    ctx.store.insert_log(log)?;
    Ok(())
}

fn print_trace(trace: &RunTrace) {
    for step in trace.stack_trace() {
        println!("  {} {}", "-".dimmed(), step);
    }
    let level = match trace.level() {
        LogLevel::Info => "INFO".green().bold(),
        LogLevel::Warning => "WARNING".yellow().bold(),
        LogLevel::Error => "ERROR".red().bold(),
    };
    println!("{level} {} ({} ms)", trace.message(), trace.execution_time());
}

fn check_level(trace: &RunTrace) -> Result<()> {
    if trace.level() == LogLevel::Error {
        return Err(CliError::user(trace.message()));
    }
    Ok(())
}

/// Run the run command
///
/// The trace is printed and stored as a job log whatever level the run ended
/// at; an ERROR run is then reported as a failure.
pub fn run_synchronization(
    ctx: &Context,
    id: &str,
    contract: Option<&str>,
    json: bool,
) -> Result<()> {
    let trace = ctx.action().run(&arguments(id, contract));
    record(ctx, &trace, SynchronizationAction::JOB_CLASS)?;

    if json {
        print_json(&trace)?;
    } else {
        print_trace(&trace);
    }
    check_level(&trace)
}

/// Run the test command
pub fn run_test(ctx: &Context, id: &str, contract: Option<&str>, json: bool) -> Result<()> {
    let run = ctx.action().test(&arguments(id, contract));
    record(ctx, &run.trace, SynchronizationAction::TEST_JOB_CLASS)?;

    if json {
        print_json(&run)?;
    } else {
        for object in &run.objects {
            let marker = if object.changed {
                "changed".yellow()
            } else {
                "unchanged".dimmed()
            };
            println!(
                "{} [{}] {}",
                object.origin_id.cyan(),
                marker,
                serde_json::to_string(&object.result_object)?
            );
        }
        print_trace(&run.trace);
    }
    check_level(&run.trace)
}
