//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engine::EngineError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No usable identity claim on the request.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// Engine (business rule) error.
    Engine(EngineError),
    /// Store error reaching the API directly (admin CRUD, reports).
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::Engine(err) => engine_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Maps the engine taxonomy to statuses, echoing the structured context the
/// clients act on (quantities, amounts, statuses) alongside the message.
fn engine_error_to_response(err: EngineError) -> (StatusCode, serde_json::Value) {
    let message = err.to_string();
    match err {
        EngineError::InvalidInput(_) => {
            (StatusCode::BAD_REQUEST, serde_json::json!({ "error": message }))
        }
        EngineError::InsufficientStock {
            available,
            requested,
            ..
        } => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": message,
                "available_stock": available,
                "requested_quantity": requested,
            }),
        ),
        EngineError::InvalidAmount { required, provided } => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": message,
                "required_amount": required.as_dollars_f64(),
                "provided_amount": provided.as_dollars_f64(),
            }),
        ),
        EngineError::InvalidState {
            current, required, ..
        } => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": message,
                "current_status": current.as_str(),
                "required_status": required,
            }),
        ),
        EngineError::CustomerNotFound { .. }
        | EngineError::ProductNotFound { .. }
        | EngineError::OrderNotFound(_) => {
            (StatusCode::NOT_FOUND, serde_json::json!({ "error": message }))
        }
        EngineError::Forbidden => (StatusCode::FORBIDDEN, serde_json::json!({ "error": message })),
        EngineError::Conflict(_) => {
            (StatusCode::CONFLICT, serde_json::json!({ "error": message }))
        }
        EngineError::Inconsistent { .. } => {
            tracing::error!(error = %message, "state inconsistency");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": message }),
            )
        }
        EngineError::Store(store_err) => store_error_to_response(store_err),
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, serde_json::Value) {
    let message = err.to_string();
    let status = match &err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
        StoreError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
        StoreError::TransitionConflict { .. } | StoreError::IllegalTransition { .. } => {
            StatusCode::CONFLICT
        }
        // Infrastructure failure: generic and retryable, distinct from the
        // business-rule rejections above.
        StoreError::Database(_) | StoreError::Migration(_) | StoreError::Serialization(_) => {
            tracing::error!(error = %message, "store failure");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "error": "Temporary storage failure. Please try again." }),
            );
        }
    };
    (status, serde_json::json!({ "error": message }))
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
