//! Controllers for the `/items` resource - one handler per verb.
//!
//! Each handler reads the authenticated subject placed in the request
//! extensions by the auth middleware, runs the matching validator, and
//! delegates to the service. Errors are not caught here; they convert to
//! responses at the `ApiError` boundary.

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Extension, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::format::items_to_api_values;
use crate::database::{DeleteOutcome, InsertOutcome, UpdateOutcome};
use crate::error::ApiError;
use crate::middleware::AuthSubject;
use crate::state::AppState;
use crate::validation::{CreateItemPayload, UpdateItemPayload};

/// Addressing parameters for update/delete, serverless style: the target id
/// rides the query string.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// GET /items - all items owned by the caller, newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(subject): Extension<AuthSubject>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let items = state.items.list(&subject.subject).await?;
    Ok(Json(items_to_api_values(&items)))
}

/// POST /items - create an item owned by the caller.
pub async fn create(
    State(state): State<AppState>,
    Extension(subject): Extension<AuthSubject>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<InsertOutcome>), ApiError> {
    let payload = CreateItemPayload::from_value(json_body(body)?)?;
    let outcome = state.items.create(&subject.subject, payload).await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// PATCH /items?id=<id> - partial update, scoped to the caller's ownership.
pub async fn update(
    State(state): State<AppState>,
    Extension(subject): Extension<AuthSubject>,
    Query(query): Query<IdQuery>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UpdateOutcome>, ApiError> {
    let id = require_id(query)?;
    let payload = UpdateItemPayload::from_value(json_body(body)?)?;
    let outcome = state.items.update(&id, &subject.subject, payload).await?;

    Ok(Json(outcome))
}

/// DELETE /items?id=<id> - permanent delete, scoped to the caller's ownership.
pub async fn remove(
    State(state): State<AppState>,
    Extension(subject): Extension<AuthSubject>,
    Query(query): Query<IdQuery>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let id = require_id(query)?;
    let outcome = state.items.remove(&id, &subject.subject).await?;

    Ok(Json(outcome))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_json(rejection.body_text()))
}

fn require_id(query: IdQuery) -> Result<String, ApiError> {
    query.id.ok_or_else(|| {
        let mut field_errors = HashMap::new();
        field_errors.insert("id".to_string(), "required".to_string());
        ApiError::validation_error("Invalid request parameters", Some(field_errors))
    })
}
