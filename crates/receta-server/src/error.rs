// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP error mapping: every failure leaves as `{ "message": ... }`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use receta_core::RecetaError;
use serde::Serialize;

/// Message returned when a failure carries no usable detail.
pub const FALLBACK_MESSAGE: &str = "Error al procesar la receta";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => {
                tracing::warn!(%message, "request rejected");
                (StatusCode::BAD_REQUEST, message)
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "receta dispatch failed");
                let message = if detail.trim().is_empty() {
                    FALLBACK_MESSAGE.to_owned()
                } else {
                    detail
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<RecetaError> for ApiError {
    fn from(err: RecetaError) -> Self {
        match err {
            RecetaError::Validation(message) => ApiError::BadRequest(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = ApiError::from(RecetaError::Validation("falta doctor".into()));
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "falta doctor"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn pipeline_failures_map_to_internal() {
        let err = ApiError::from(RecetaError::Mail("relay refused".into()));
        assert!(matches!(err, ApiError::Internal(ref m) if m.contains("relay refused")));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
