// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every failure leaves the API as `{"error": {"message": ..., "exn": ...}}`.

use crate::db::StoreError;
use crate::validation::FieldError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("request failed validation")]
    Validation(Vec<FieldError>),

    #[error("email exists")]
    UserExists,

    #[error("trip full")]
    TripFull,

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_)
            | AppError::Validation(_)
            | AppError::UserExists
            | AppError::TripFull
            | AppError::NotFound(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserExists => AppError::UserExists,
            StoreError::NotFound => AppError::NotFound("not found".to_string()),
            StoreError::TripFull => AppError::TripFull,
            StoreError::Database(msg) => AppError::Database(msg),
        }
    }
}

/// Marker attached to 500 responses so the alerting middleware can report
/// the underlying cause without exposing it to clients.
#[derive(Debug, Clone)]
pub struct ServerFault(pub String);

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exn: Option<serde_json::Value>,
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, exn, fault) = match &self {
            AppError::Validation(fields) => (
                self.to_string(),
                serde_json::to_value(fields).ok(),
                None,
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("internal server error".to_string(), None, Some(self.to_string()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal server error".to_string(), None, Some(self.to_string()))
            }
            _ => (self.to_string(), None, None),
        };

        let body = ErrorResponse {
            error: ErrorBody { message, exn },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(fault) = fault {
            response.extensions_mut().insert(ServerFault(fault));
        }
        response
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_domain_errors_are_bad_requests() {
        for err in [
            AppError::TripFull,
            AppError::UserExists,
            AppError::NotFound("unknown trip".to_string()),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = AppError::TripFull.into_response();
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "trip full");
        assert!(json["error"].get("exn").is_none());
    }

    #[tokio::test]
    async fn test_database_error_hides_details_and_marks_fault() {
        let response = AppError::Database("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<ServerFault>().is_some());

        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn test_validation_errors_listed_in_exn() {
        let response = AppError::Validation(vec![FieldError {
            field: "tripHour".to_string(),
            message: "must be between 0 and 23".to_string(),
        }])
        .into_response();

        let json = body_json(response).await;
        assert_eq!(json["error"]["exn"][0]["field"], "tripHour");
    }
}
