//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docqa_core::DocQaError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Returned when the query string is empty after trimming
pub const EMPTY_QUERY_MESSAGE: &str = "Query string cannot be empty.";

/// Returned for every failure while answering a query
pub const QUERY_FAILED_MESSAGE: &str = "An error occurred while processing the query.";

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Human-readable message
    #[schema(example = "Query string cannot be empty.")]
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Invalid client input, reported verbatim
    BadRequest(String),
    /// Query processing failed; the cause is logged, never returned
    QueryFailed(DocQaError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorDetail::new(msg)),
            AppError::QueryFailed(err) => {
                tracing::error!(
                    error = %err,
                    upstream = err.is_upstream(),
                    "Error processing query"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorDetail::new(QUERY_FAILED_MESSAGE),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl AppError {
    /// Report a rejected input, using the error's own message as the detail
    pub fn bad_request(err: DocQaError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<DocQaError> for AppError {
    fn from(err: DocQaError) -> Self {
        AppError::QueryFailed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bad_request_body() {
        let response = AppError::BadRequest(EMPTY_QUERY_MESSAGE.to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"detail": EMPTY_QUERY_MESSAGE}));
    }

    #[tokio::test]
    async fn test_validation_error_keeps_message() {
        let response =
            AppError::bad_request(DocQaError::Validation(EMPTY_QUERY_MESSAGE.to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], EMPTY_QUERY_MESSAGE);
    }

    #[tokio::test]
    async fn test_query_failure_hides_cause() {
        let response =
            AppError::QueryFailed(DocQaError::Llm("secret upstream detail".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret"));
        assert!(text.contains(QUERY_FAILED_MESSAGE));
    }
}
