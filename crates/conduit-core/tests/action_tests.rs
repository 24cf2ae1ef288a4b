//! Tests for the run action and the traces it produces

use conduit_core::adapters::memory::{MemorySource, MemoryTarget};
use conduit_core::{
    AdapterRegistry, AdminService, CancellationToken, ContractStatus, ContractStore,
    DefinitionStore, JobLog, LogLevel, Store, SyncEngine, SynchronizationAction,
    SynchronizationDefinition,
};
use conduit_mapping::MappingDefinition;
use conduit_test_utils::{TestWorkspace, fixtures};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Map, Value, json};
use std::sync::Arc;

struct Harness {
    store: Arc<Store>,
    source: MemorySource,
    target: MemoryTarget,
    engine: Arc<SyncEngine>,
    action: SynchronizationAction,
}

fn harness() -> Harness {
    let store = Arc::new(Store::in_memory());
    let source = MemorySource::new();
    let target = MemoryTarget::new();

    let mut registry = AdapterRegistry::with_defaults();
    registry.register_source(MemorySource::TYPE, Arc::new(source.clone()));
    registry.register_target(MemoryTarget::TYPE, Arc::new(target.clone()));

    let engine = Arc::new(SyncEngine::new(store.clone(), store.clone(), registry));
    let action = SynchronizationAction::new(store.clone(), store.clone(), engine.clone());
    Harness {
        store,
        source,
        target,
        engine,
        action,
    }
}

fn memory_definition(store: &Store, delete_old_targets: bool) -> SynchronizationDefinition {
    let config = |value: Value| -> Map<String, Value> { value.as_object().cloned().unwrap() };
    store
        .insert_definition(SynchronizationDefinition::new(
            "people",
            config(json!({"type": "memory"})),
            config(json!({"type": "memory", "deleteOldTargets": delete_old_targets})),
            MappingDefinition::from_rules(fixtures::person_mapping()).unwrap(),
        ))
        .unwrap()
}

#[rstest]
#[case(json!({}), "No synchronization ID provided")]
#[case(json!({"synchronizationId": null}), "No synchronization ID provided")]
#[case(json!({"synchronizationId": "abc"}), "Invalid synchronization ID: abc")]
#[case(json!({"synchronizationId": [1]}), "Invalid synchronization ID: [1]")]
fn test_bad_arguments_end_in_error(#[case] arguments: Value, #[case] message: &str) {
    let h = harness();
    let trace = h.action.run(&arguments);

    assert_eq!(trace.level(), LogLevel::Error);
    assert_eq!(trace.message(), message);
    assert_eq!(
        trace.stack_trace(),
        ["Checking for a valid synchronization ID".to_string(), message.to_string()]
    );
    assert_eq!(trace.arguments(), &arguments);
}

#[test]
fn test_unknown_synchronization_is_a_warning() {
    let h = harness();
    let trace = h.action.run(&json!({"synchronizationId": 99}));

    assert_eq!(trace.level(), LogLevel::Warning);
    assert_eq!(trace.message(), "Synchronization not found: 99");
    assert_eq!(
        trace.stack_trace(),
        [
            "Checking for a valid synchronization ID",
            "Getting synchronization: 99",
            "Synchronization not found: 99",
        ]
    );
    assert!(h.store.find_contracts(&Default::default()).unwrap().is_empty());
}

#[test]
fn test_successful_run_trace() {
    let h = harness();
    h.source.replace(fixtures::people_abc());
    let def = memory_definition(&h.store, false);

    let trace = h.action.run(&json!({"synchronizationId": def.id.to_string()}));

    assert_eq!(trace.level(), LogLevel::Info);
    assert_eq!(trace.message(), "Synchronized 3 successfully");
    assert_eq!(
        trace.stack_trace(),
        [
            "Checking for a valid synchronization ID".to_string(),
            format!("Getting synchronization: {}", def.id),
            "Doing the synchronization".to_string(),
            "Synchronized 3 successfully".to_string(),
        ]
    );
    assert!(trace.finished_at() >= trace.started_at());
    assert!(!h.engine.locks().is_running(def.id));
}

#[test]
fn test_run_with_stale_deletion_reports_count() {
    let h = harness();
    h.source.replace(fixtures::people_abc());
    let def = memory_definition(&h.store, true);
    h.action.run(&json!({"synchronizationId": def.id}));

    h.source.remove("B");
    let trace = h.action.run(&json!({"synchronizationId": def.id}));

    assert_eq!(trace.level(), LogLevel::Info);
    assert_eq!(trace.message(), "Synchronized 0 successfully");
    let steps = trace.stack_trace();
    assert_eq!(
        steps[steps.len() - 3..],
        [
            "Checking for targets to delete that don't exist in the source anymore",
            "Deleted 1 targets that don't exist in their source anymore",
            "Synchronized 0 successfully",
        ]
    );
    assert_eq!(h.target.objects().len(), 2);
}

#[test]
fn test_object_failures_are_listed_but_run_succeeds() {
    let h = harness();
    h.source.replace(fixtures::people_abc());
    h.target
        .reject_when(|p| (p["fullName"] == "Cy").then(|| "too short".to_string()));
    let def = memory_definition(&h.store, false);

    let trace = h.action.run(&json!({"synchronizationId": def.id}));

    assert_eq!(trace.level(), LogLevel::Info);
    assert_eq!(trace.message(), "Synchronized 2 successfully");
    assert!(trace.stack_trace().contains(
        &"Failed to synchronize object C: Target rejected object: too short".to_string()
    ));
}

#[test]
fn test_fetch_failure_ends_in_error() {
    let h = harness();
    h.source.set_unavailable(Some("connection refused"));
    let def = memory_definition(&h.store, false);

    let trace = h.action.run(&json!({"synchronizationId": def.id}));

    assert_eq!(trace.level(), LogLevel::Error);
    assert_eq!(
        trace.message(),
        "Failed to synchronize: Source unavailable: connection refused"
    );
    assert_eq!(
        trace.stack_trace()[trace.stack_trace().len() - 2],
        "Doing the synchronization"
    );
}

#[test]
fn test_deletion_failure_ends_in_error() {
    let h = harness();
    h.source.replace(fixtures::people_abc());
    let def = memory_definition(&h.store, true);
    h.action.run(&json!({"synchronizationId": def.id}));

    let b = h
        .store
        .find_by_synchronization(def.id)
        .unwrap()
        .into_iter()
        .find(|c| c.origin_id == "B")
        .unwrap();
    h.target.fail_delete(b.target_id.unwrap());
    h.source.remove("B");

    let trace = h.action.run(&json!({"synchronizationId": def.id}));
    assert_eq!(trace.level(), LogLevel::Error);
    assert!(trace.message().starts_with("Failed to delete targets: "));
    assert_eq!(h.store.count_for_synchronization(def.id).unwrap(), 3);
}

#[test]
fn test_concurrent_run_is_refused() {
    let h = harness();
    let def = memory_definition(&h.store, false);

    let _held = h.engine.locks().acquire(def.id).unwrap();
    let trace = h.action.run(&json!({"synchronizationId": def.id}));

    assert_eq!(trace.level(), LogLevel::Error);
    assert_eq!(
        trace.message(),
        format!(
            "Failed to synchronize: Synchronization {} is already running",
            def.id
        )
    );
}

#[test]
fn test_contract_scoped_run() {
    let h = harness();
    h.source.replace(fixtures::people_abc());
    let def = memory_definition(&h.store, true);
    h.action.run(&json!({"synchronizationId": def.id}));

    let a = h
        .store
        .find_by_synchronization(def.id)
        .unwrap()
        .into_iter()
        .find(|c| c.origin_id == "A")
        .unwrap();
    h.source.remove("B");
    h.source.remove("A");
    h.source.push("A", json!({"id": "A", "name": "Ada L.", "age": 37}));

    let trace = h.action.run(&json!({
        "synchronizationId": def.id,
        "synchronizationContractId": a.id
    }));

    assert_eq!(trace.message(), "Synchronized 1 successfully");
    assert!(
        !trace
            .stack_trace()
            .iter()
            .any(|step| step.starts_with("Checking for targets to delete"))
    );
    // B's target survives a contract-scoped run.
    assert_eq!(h.target.objects().len(), 3);
}

#[test]
fn test_unknown_contract_is_a_warning() {
    let h = harness();
    let def = memory_definition(&h.store, false);

    let trace = h.action.run(&json!({
        "synchronizationId": def.id,
        "synchronizationContractId": 404
    }));

    assert_eq!(trace.level(), LogLevel::Warning);
    assert_eq!(trace.message(), "Synchronization contract not found: 404");
}

#[test]
fn test_cancelled_run_is_a_warning() {
    let h = harness();
    h.source.replace(fixtures::people_abc());
    let def = memory_definition(&h.store, true);
    let token = CancellationToken::new();
    token.cancel();

    let trace = h
        .action
        .run_with_cancellation(&json!({"synchronizationId": def.id}), token);

    assert_eq!(trace.level(), LogLevel::Warning);
    assert_eq!(
        trace.message(),
        "Synchronization cancelled after 0 objects were written"
    );
    assert_eq!(h.target.write_count(), 0);
}

#[test]
fn test_run_after_cancelled_run_completes() {
    let h = harness();
    h.source.replace(fixtures::people_abc());
    let def = memory_definition(&h.store, true);
    let arguments = json!({"synchronizationId": def.id});
    let token = CancellationToken::new();
    token.cancel();
    h.action.run_with_cancellation(&arguments, token);

    let trace = h.action.run(&arguments);

    assert_eq!(trace.level(), LogLevel::Info);
    assert_eq!(trace.message(), "Synchronized 3 successfully");
}

#[test]
fn test_test_run_maps_without_writing() {
    let h = harness();
    h.source.replace(fixtures::people_abc());
    let def = memory_definition(&h.store, true);

    let run = h.action.test(&json!({"synchronizationId": def.id}));

    assert_eq!(run.trace.level(), LogLevel::Info);
    assert_eq!(
        run.trace.stack_trace(),
        [
            "Checking for a valid synchronization ID".to_string(),
            format!("Getting synchronization: {}", def.id),
            "Testing the synchronization".to_string(),
            "Tested 3 objects, 3 would be written".to_string(),
        ]
    );
    assert_eq!(run.objects[0].result_object, json!({"fullName": "Ada", "userAge": 36}));
    assert_eq!(h.target.write_count(), 0);
    assert_eq!(h.store.count_for_synchronization(def.id).unwrap(), 0);

    let value = serde_json::to_value(&run).unwrap();
    assert_eq!(value["level"], "INFO");
    assert_eq!(value["objects"].as_array().unwrap().len(), 3);
}

#[test]
fn test_test_run_shares_argument_checks() {
    let h = harness();
    let run = h.action.test(&json!({"synchronizationId": 999}));

    assert_eq!(run.trace.level(), LogLevel::Warning);
    assert_eq!(run.trace.message(), "Synchronization not found: 999");
    assert!(run.objects.is_empty());
}

#[test]
fn test_test_run_fetch_failure_is_error() {
    let h = harness();
    h.source.set_unavailable(Some("connection refused"));
    let def = memory_definition(&h.store, false);

    let run = h.action.test(&json!({"synchronizationId": def.id}));

    assert_eq!(run.trace.level(), LogLevel::Error);
    assert_eq!(
        run.trace.message(),
        "Failed to test synchronization: Source unavailable: connection refused"
    );
}

#[test]
fn test_job_log_from_trace() {
    let h = harness();
    h.source.replace(fixtures::people_abc());
    let def = memory_definition(&h.store, false);
    let trace = h.action.run(&json!({"synchronizationId": def.id}));

    let log = JobLog::from_trace(
        &trace,
        SynchronizationAction::JOB_CLASS,
        chrono::Duration::days(7),
    );

    assert_eq!(log.synchronization_id(), Some(def.id));
    let value = serde_json::to_value(&log).unwrap();
    assert_eq!(value["level"], "INFO");
    assert_eq!(value["message"], "Synchronized 3 successfully");
    assert_eq!(value["jobClass"], SynchronizationAction::JOB_CLASS);
    assert_eq!(value["jobId"], trace.uuid().to_string());
}

#[test]
fn test_john_doe_end_to_end_through_files() {
    let ws = TestWorkspace::new();
    let source = ws.write_source("people.json", &json!([fixtures::john_doe()]));
    let target_dir = ws.target_dir("people");

    let store = Arc::new(Store::open(ws.data_dir().as_path()).unwrap());
    let admin = AdminService::new(store.clone(), store.clone(), store.clone());
    let def = admin
        .create_synchronization(fixtures::json_file_definition(
            "people",
            &source,
            &target_dir,
            true,
        ))
        .unwrap();

    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        store.clone(),
        AdapterRegistry::with_defaults(),
    ));
    let action = SynchronizationAction::new(store.clone(), store.clone(), engine);
    let trace = action.run(&json!({"synchronizationId": def.id}));

    assert_eq!(trace.level(), LogLevel::Info, "{:?}", trace.stack_trace());
    assert_eq!(
        ws.target_objects("people"),
        vec![json!({"fullName": "John Doe", "userAge": 30})]
    );

    let contracts = store.find_by_synchronization(def.id).unwrap();
    assert_eq!(contracts.len(), 1);
    assert_eq!(contracts[0].origin_id, "1");
    assert_eq!(contracts[0].status, ContractStatus::Synced);

    // Contracts survive reopening the data directory.
    drop((action, admin, store));
    let reopened = Store::open(ws.data_dir().as_path()).unwrap();
    assert_eq!(reopened.count_for_synchronization(def.id).unwrap(), 1);
    assert!(reopened.find_definition(def.id).unwrap().is_some());
}
