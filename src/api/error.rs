//! Mapping of store errors onto HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::interfaces::{ErrorKind, StoreError};

/// Error body: `{"err": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub err: String,
}

/// Handler error carrying the store error it came from.
#[derive(Debug)]
pub struct ApiError(pub StoreError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Query => StatusCode::BAD_REQUEST,
            ErrorKind::Empty => StatusCode::NO_CONTENT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(StoreError::Query(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // 204 must not carry a body.
        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            err: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
