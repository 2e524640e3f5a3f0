//! Response envelopes.

use crate::accept;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use slumber_core::{ErrorResponse, SlumberError};
use tracing::error;

/// The `_meta` block every response carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Meta {
    /// A `200 OK` block.
    #[must_use]
    pub fn ok(username: Option<String>) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: "OK".to_string(),
            username,
        }
    }

    /// A block describing an error.
    #[must_use]
    pub fn error(error: &SlumberError, username: Option<String>) -> Self {
        Self {
            status: error.status_code(),
            message: error.to_string(),
            username,
        }
    }
}

/// Builds a response document: `body` plus its `_meta` block.
#[must_use]
pub fn envelope(meta: &Meta, mut body: Map<String, Value>) -> Value {
    body.insert(
        "_meta".to_string(),
        serde_json::to_value(meta).unwrap_or(Value::Null),
    );
    Value::Object(body)
}

/// Builds the document for an error response.
#[must_use]
pub fn error_document(error: &SlumberError, username: Option<String>) -> Value {
    let mut body = Map::new();
    body.insert(
        "error".to_string(),
        serde_json::to_value(ErrorResponse::from_error(error)).unwrap_or(Value::Null),
    );
    envelope(&Meta::error(error, username), body)
}

/// Application error type for Axum.
#[derive(Debug)]
pub struct AppError(pub SlumberError);

impl From<SlumberError> for AppError {
    fn from(err: SlumberError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.0.status_code() >= 500 {
            error!(error = %self.0, "Request failed");
        }
        match accept::render(&error_document(&self.0, None), false) {
            Ok(response) => response,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
