//! The unit of work a scheduler invokes
//!
//! [`SynchronizationAction::run`] never fails: every outcome, including bad
//! arguments and engine errors, becomes a [`RunTrace`] whose level and message
//! describe how the run ended. Each step is appended to the trace before it
//! is attempted, so a failing step is always the last one listed before the
//! terminal message. [`SynchronizationAction::test`] walks the same steps as
//! a dry run.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::adapters::CancellationToken;
use crate::model::{LogLevel, RunTrace, SynchronizationDefinition, TraceBuilder};
use crate::store::{ContractStore, DefinitionStore};
use crate::sync::{PreviewObject, SyncEngine, SyncScope};

/// Trace of a test run plus the objects it mapped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    #[serde(flatten)]
    pub trace: RunTrace,
    pub objects: Vec<PreviewObject>,
}

/// Runs one synchronization and reports it as a trace
pub struct SynchronizationAction {
    definitions: Arc<dyn DefinitionStore>,
    contracts: Arc<dyn ContractStore>,
    engine: Arc<SyncEngine>,
}

impl SynchronizationAction {
    /// Value recorded as `jobClass` on the job logs of this action
    pub const JOB_CLASS: &'static str = "conduit::SynchronizationAction";
    /// `jobClass` of test run job logs
    pub const TEST_JOB_CLASS: &'static str = "conduit::SynchronizationTest";

    pub fn new(
        definitions: Arc<dyn DefinitionStore>,
        contracts: Arc<dyn ContractStore>,
        engine: Arc<SyncEngine>,
    ) -> Self {
        Self {
            definitions,
            contracts,
            engine,
        }
    }

    /// Execute with `arguments` such as `{"synchronizationId": 1}`.
    ///
    /// An optional `synchronizationContractId` restricts the run to the
    /// source object of that contract.
    pub fn run(&self, arguments: &Value) -> RunTrace {
        self.run_with_cancellation(arguments, CancellationToken::new())
    }

    /// Execute like [`SynchronizationAction::run`]; cancelling `cancellation`
    /// stops this run before its next object.
    #[tracing::instrument(skip(self, cancellation))]
    pub fn run_with_cancellation(
        &self,
        arguments: &Value,
        cancellation: CancellationToken,
    ) -> RunTrace {
        let (mut trace, definition, scope) = match self.resolve(arguments) {
            Ok(resolved) => resolved,
            Err(trace) => return trace,
        };

        trace.step("Doing the synchronization");
        let session = match self.engine.begin_with(&definition, cancellation) {
            Ok(session) => session,
            Err(error) => {
                return trace.finish(LogLevel::Error, format!("Failed to synchronize: {error}"));
            }
        };
        let outcome = match session.synchronize(&scope) {
            Ok(outcome) => outcome,
            Err(error) => {
                return trace.finish(LogLevel::Error, format!("Failed to synchronize: {error}"));
            }
        };

        for failure in &outcome.failures {
            trace.step(format!("Failed to synchronize object {failure}"));
        }

        if outcome.cancelled {
            return trace.finish(
                LogLevel::Warning,
                format!(
                    "Synchronization cancelled after {} objects were written",
                    outcome.written
                ),
            );
        }

        // A contract-scoped run has not seen the whole source.
        if definition.delete_old_targets() && scope == SyncScope::All {
            trace.step("Checking for targets to delete that don't exist in the source anymore");
            match session.delete_old_targets(&outcome.origin_ids) {
                Ok(count) => trace.step(format!(
                    "Deleted {count} targets that don't exist in their source anymore"
                )),
                Err(error) => {
                    return trace.finish(
                        LogLevel::Error,
                        format!("Failed to delete targets: {error}"),
                    );
                }
            }
        }

        trace.finish(
            LogLevel::Info,
            format!("Synchronized {} successfully", outcome.written),
        )
    }

    /// Fetch and map like [`SynchronizationAction::run`] without writing
    /// targets or touching contracts.
    #[tracing::instrument(skip(self))]
    pub fn test(&self, arguments: &Value) -> TestRun {
        let finished = |trace: RunTrace| TestRun {
            trace,
            objects: Vec::new(),
        };
        let (mut trace, definition, scope) = match self.resolve(arguments) {
            Ok(resolved) => resolved,
            Err(trace) => return finished(trace),
        };

        trace.step("Testing the synchronization");
        let preview = match self.engine.preview(&definition, &scope) {
            Ok(preview) => preview,
            Err(error) => {
                return finished(trace.finish(
                    LogLevel::Error,
                    format!("Failed to test synchronization: {error}"),
                ));
            }
        };

        for failure in &preview.failures {
            trace.step(format!("Failed to map object {failure}"));
        }
        let message = format!(
            "Tested {} objects, {} would be written",
            preview.objects.len(),
            preview.changed()
        );
        TestRun {
            trace: trace.finish(LogLevel::Info, message),
            objects: preview.objects,
        }
    }

    /// Validate the arguments and load what they name.
    ///
    /// `Err` holds the finished trace of a run that cannot proceed.
    fn resolve(
        &self,
        arguments: &Value,
    ) -> Result<(TraceBuilder, SynchronizationDefinition, SyncScope), RunTrace> {
        let mut trace = TraceBuilder::start(arguments.clone());

        trace.step("Checking for a valid synchronization ID");
        let id = match arguments.get("synchronizationId") {
            None | Some(Value::Null) => {
                return Err(trace.finish(LogLevel::Error, "No synchronization ID provided"));
            }
            Some(value) => match parse_id(value) {
                Some(id) => id,
                None => {
                    return Err(trace.finish(
                        LogLevel::Error,
                        format!("Invalid synchronization ID: {}", display(value)),
                    ));
                }
            },
        };

        trace.step(format!("Getting synchronization: {id}"));
        let definition = match self.definitions.find_definition(id) {
            Ok(Some(definition)) => definition,
            Ok(None) => {
                return Err(
                    trace.finish(LogLevel::Warning, format!("Synchronization not found: {id}"))
                );
            }
            Err(error) => {
                return Err(trace.finish(
                    LogLevel::Error,
                    format!("Failed to load synchronization: {error}"),
                ));
            }
        };

        let scope = match arguments.get("synchronizationContractId") {
            None | Some(Value::Null) => SyncScope::All,
            Some(value) => {
                trace.step(format!("Getting synchronization contract: {}", display(value)));
                let found = parse_id(value).map(|contract_id| self.contracts.find_contract(contract_id));
                match found {
                    Some(Ok(Some(contract))) if contract.synchronization_id == id => {
                        SyncScope::Contract(contract.origin_id)
                    }
                    Some(Err(error)) => {
                        return Err(trace.finish(
                            LogLevel::Error,
                            format!("Failed to load synchronization contract: {error}"),
                        ));
                    }
                    _ => {
                        return Err(trace.finish(
                            LogLevel::Warning,
                            format!("Synchronization contract not found: {}", display(value)),
                        ));
                    }
                }
            }
        };

        Ok((trace, definition, scope))
    }
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(4), Some(4))]
    #[case(json!("12"), Some(12))]
    #[case(json!(" 3 "), Some(3))]
    #[case(json!("abc"), None)]
    #[case(json!(1.5), None)]
    #[case(json!(true), None)]
    fn test_parse_id(#[case] value: Value, #[case] expected: Option<i64>) {
        assert_eq!(parse_id(&value), expected);
    }
}
