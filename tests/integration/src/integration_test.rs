//! End-to-end integration test for the whole pipeline
//!
//! Exercises: config loading -> admin create -> run action -> job log ->
//! HTTP read-back, over a real data directory.

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use conduit_core::{
    AdapterRegistry, ConfigResolver, ContractStatus, ContractStore, JobLog, JobLogStore,
    LogLevel, Store, SynchronizationAction,
};
use conduit_server::{AppState, router};
use conduit_test_utils::{TestWorkspace, fixtures};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

#[test]
fn test_settings_drive_engine_options() {
    let ws = TestWorkspace::new();
    let data_dir = ws.data_dir();
    ws.write_file(
        &data_dir.join("conduit.toml"),
        "[sync]\ncallTimeoutSecs = 5\nfailFast = true\n\n[logs]\nretentionDays = 2\n",
    );

    let settings =
        ConfigResolver::with_global_config_dir(data_dir.as_path(), ws.root().join("no-global"))
            .resolve()
            .unwrap();

    let options = settings.sync_options();
    assert_eq!(options.call_timeout.as_secs(), 5);
    assert!(options.fail_fast);
    assert_eq!(settings.log_retention().num_days(), 2);
}

#[test]
fn test_run_persists_contracts_and_logs_across_reopen() {
    let ws = TestWorkspace::new();
    let people: Vec<Value> = fixtures::people_abc()
        .into_iter()
        .map(|(_, person)| person)
        .collect();
    let source = ws.write_source("people.json", &Value::Array(people));
    let target_dir = ws.target_dir("people");

    let id = {
        let store = Arc::new(Store::open(ws.data_dir().as_path()).unwrap());
        let state = AppState::new(store.clone(), AdapterRegistry::with_defaults(), Default::default());
        let definition = state
            .admin
            .create_synchronization(fixtures::json_file_definition(
                "people",
                &source,
                &target_dir,
                true,
            ))
            .unwrap();

        let trace = state.action.run(&json!({"synchronizationId": definition.id}));
        assert_eq!(trace.level(), LogLevel::Info, "{:?}", trace.stack_trace());
        store
            .insert_log(JobLog::from_trace(
                &trace,
                SynchronizationAction::JOB_CLASS,
                state.settings.log_retention(),
            ))
            .unwrap();
        definition.id
    };

    let reopened = Store::open(ws.data_dir().as_path()).unwrap();
    let contracts = reopened.find_by_synchronization(id).unwrap();
    assert_eq!(contracts.len(), 3);
    assert!(contracts.iter().all(|c| c.status == ContractStatus::Synced));

    let logs = reopened.logs_for_synchronization(id).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "Synchronized 3 successfully");
    assert_eq!(ws.target_objects("people").len(), 3);
}

#[tokio::test]
async fn test_http_run_then_read_back_logs() {
    let ws = TestWorkspace::new();
    let source = ws.write_source("people.json", &json!([fixtures::john_doe()]));
    let store = Arc::new(Store::open(ws.data_dir().as_path()).unwrap());
    let state = AppState::new(store, AdapterRegistry::with_defaults(), Default::default());
    let definition = state
        .admin
        .create_synchronization(fixtures::json_file_definition(
            "people",
            &source,
            &ws.target_dir("people"),
            false,
        ))
        .unwrap();
    let app = router(state);

    let run = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/synchronizations-run/{}", definition.id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(run).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let logs = Request::builder()
        .uri(format!("/api/synchronizations-logs/{}", definition.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(logs).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    let log = &body["results"][0];
    assert_eq!(log["level"], "INFO");
    assert_eq!(log["jobClass"], SynchronizationAction::JOB_CLASS);
    assert_eq!(log["arguments"]["synchronizationId"], definition.id.to_string());
    assert_eq!(log["stackTrace"][0], "Checking for a valid synchronization ID");
}
