use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use conduit_core::{DefinitionStore, Filter, SynchronizationDefinition};
use serde_json::Value;
use std::collections::HashMap;

use super::Results;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Results<SynchronizationDefinition>>> {
    let filter = Filter::from_params(params)?;
    Ok(Json(state.store.find_definitions(&filter)?.into()))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SynchronizationDefinition>> {
    state
        .store
        .find_definition(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Synchronization {id} not found")))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SynchronizationDefinition>)> {
    let Json(input) = payload?;
    let definition = state.admin.create_synchronization(input)?;
    Ok((StatusCode::CREATED, Json(definition)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<SynchronizationDefinition>> {
    let Json(input) = payload?;
    Ok(Json(state.admin.update_synchronization(id, input)?))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.admin.delete_synchronization(id)?;
    Ok(StatusCode::NO_CONTENT)
}
