use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use conduit_core::{Filter, MappingRecord, MappingStore};
use conduit_mapping::{MappingDefinition, ValidationReport};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::Results;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Results<MappingRecord>>> {
    let filter = Filter::from_params(params)?;
    Ok(Json(state.store.find_mappings(&filter)?.into()))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<MappingRecord>> {
    state
        .store
        .find_mapping(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Mapping {id} not found")))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MappingRecord>)> {
    let Json(input) = payload?;
    Ok((StatusCode::CREATED, Json(state.admin.create_mapping(input)?)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<MappingRecord>> {
    let Json(input) = payload?;
    Ok(Json(state.admin.update_mapping(id, input)?))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.admin.delete_mapping(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingTestResponse {
    pub result_object: Value,
    #[serde(flatten)]
    pub report: ValidationReport,
}

/// Evaluate a mapping against an input object without storing anything.
///
/// `inputObject` and `mapping` may be JSON values or JSON-encoded strings.
/// Validation runs only when both `schema` and a truthy `validation` are
/// given.
pub async fn test(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<MappingTestResponse>> {
    let Json(body) = payload?;

    let (Some(input), Some(mapping)) = (present(&body, "inputObject"), present(&body, "mapping"))
    else {
        return Err(ApiError::bad_request("Both inputObject and mapping are required"));
    };
    let input = decode_field("inputObject", input)?;
    let mapping = decode_field("mapping", mapping)?;

    let definition =
        MappingDefinition::from_value(mapping).map_err(|e| ApiError::mapping(e.to_string()))?;
    let result_object =
        conduit_mapping::map(&definition, &input).map_err(|e| ApiError::mapping(e.to_string()))?;

    let schema = present(&body, "schema").and_then(Value::as_str).filter(|s| !s.is_empty());
    let validate = present(&body, "validation").is_some_and(truthy);
    let report = match schema {
        Some(schema) if validate => {
            ValidationReport::check(state.validator.as_ref(), Some(schema), &result_object)
        }
        _ => ValidationReport::valid(),
    };

    Ok(Json(MappingTestResponse {
        result_object,
        report,
    }))
}

fn present<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get(key).filter(|value| !value.is_null())
}

fn decode_field(name: &str, value: &Value) -> ApiResult<Value> {
    match value {
        Value::String(text) => serde_json::from_str(text)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON for {name}: {e}"))),
        other => Ok(other.clone()),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0" && s != "false",
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
