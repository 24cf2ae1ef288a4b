use axum::Json;
use axum::extract::{Path, Query, State};
use conduit_core::{
    ContractStore, DefinitionStore, JobLog, JobLogStore, RunTrace, SynchronizationAction,
    SynchronizationContract, TestRun,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::Results;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParams {
    pub synchronization_contract_id: Option<String>,
}

/// Parse a numeric path or query id; anything else is a 400.
fn parse_id(raw: &str, what: &str) -> ApiResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid {what} ID: {raw}")))
}

fn arguments(id: &str, params: RunParams) -> ApiResult<Value> {
    let mut arguments = json!({ "synchronizationId": parse_id(id, "synchronization")? });
    if let Some(contract_id) = params.synchronization_contract_id {
        arguments["synchronizationContractId"] =
            json!(parse_id(&contract_id, "synchronization contract")?);
    }
    Ok(arguments)
}

fn persist_log(state: &AppState, trace: &RunTrace, job_class: &str) -> ApiResult<()> {
    let log = JobLog::from_trace(trace, job_class, state.settings.log_retention());
    state.store.insert_log(log)?;
    Ok(())
}

/// Run one synchronization and persist its job log.
///
/// Answers 200 with the trace whatever level the run ended at; only a
/// malformed id is rejected up front.
#[tracing::instrument(skip(state, params))]
pub async fn run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RunParams>,
) -> ApiResult<Json<RunTrace>> {
    let arguments = arguments(&id, params)?;

    let action = state.action.clone();
    let trace = tokio::task::spawn_blocking(move || action.run(&arguments)).await?;

    persist_log(&state, &trace, SynchronizationAction::JOB_CLASS)?;
    tracing::info!(level = %trace.level(), outcome = trace.message(), "Run finished");

    Ok(Json(trace))
}

/// Map a synchronization's source objects without writing them.
///
/// The response is the trace plus an `objects` list; the test run is logged
/// like a real run.
#[tracing::instrument(skip(state, params))]
pub async fn test(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RunParams>,
) -> ApiResult<Json<TestRun>> {
    let arguments = arguments(&id, params)?;

    let action = state.action.clone();
    let run = tokio::task::spawn_blocking(move || action.test(&arguments)).await?;

    persist_log(&state, &run.trace, SynchronizationAction::TEST_JOB_CLASS)?;
    tracing::info!(level = %run.trace.level(), outcome = run.trace.message(), "Test run finished");

    Ok(Json(run))
}

pub async fn logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Results<JobLog>>> {
    let id = parse_id(&id, "synchronization")?;
    Ok(Json(state.store.logs_for_synchronization(id)?.into()))
}

pub async fn contracts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Results<SynchronizationContract>>> {
    let id = parse_id(&id, "synchronization")?;
    if state.store.find_definition(id)?.is_none() {
        return Err(ApiError::not_found(format!("Synchronization {id} not found")));
    }
    Ok(Json(state.store.find_by_synchronization(id)?.into()))
}
