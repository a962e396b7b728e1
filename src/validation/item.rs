//! Structural validation for inbound item payloads.
//!
//! Controllers parse request bodies through these types before anything
//! reaches the service layer, so a violation short-circuits with no
//! persistence side effect. Unknown fields are dropped - in particular a
//! client-supplied `owner` never survives parsing.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

/// Body of POST /items. `name` is required and non-empty; everything else is
/// optional.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl CreateItemPayload {
    pub fn from_value(body: Value) -> Result<Self, ApiError> {
        let payload: Self =
            serde_json::from_value(body).map_err(|e| ApiError::invalid_json(e.to_string()))?;

        let mut field_errors = HashMap::new();
        if payload.name.trim().is_empty() {
            field_errors.insert(
                "name".to_string(),
                "required and must not be empty".to_string(),
            );
        }

        if !field_errors.is_empty() {
            return Err(ApiError::validation_error(
                "Invalid item payload",
                Some(field_errors),
            ));
        }

        Ok(payload)
    }
}

/// Body of PATCH /items - every field optional, an empty object is a valid
/// no-op update. A name that is present must still be non-empty.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl UpdateItemPayload {
    pub fn from_value(body: Value) -> Result<Self, ApiError> {
        let payload: Self =
            serde_json::from_value(body).map_err(|e| ApiError::invalid_json(e.to_string()))?;

        let mut field_errors = HashMap::new();
        if let Some(name) = &payload.name {
            if name.trim().is_empty() {
                field_errors.insert("name".to_string(), "must not be empty".to_string());
            }
        }

        if !field_errors.is_empty() {
            return Err(ApiError::validation_error(
                "Invalid item payload",
                Some(field_errors),
            ));
        }

        Ok(payload)
    }
}
