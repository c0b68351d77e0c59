//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::ServiceError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Fulfillment or settlement error.
    Service(ServiceError),
}

impl ApiError {
    /// Returns the HTTP status and the error code reported in the body.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Service(err) => (service_status(err), err.kind()),
        }
    }
}

fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::OutOfStock { .. } => StatusCode::CONFLICT,
        ServiceError::InvalidQuantity { .. }
        | ServiceError::AmountOverflow { .. }
        | ServiceError::InvalidPaymentStatus(_)
        | ServiceError::InsufficientAmount { .. }
        | ServiceError::InvalidFailedAmount { .. } => StatusCode::BAD_REQUEST,
        ServiceError::CascadeIncomplete { .. }
        | ServiceError::BulkCascadeIncomplete { .. }
        | ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Service(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, code, "internal server error");
        }

        let body = serde_json::json!({
            "status": "error",
            "code": code,
            "message": message,
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}
