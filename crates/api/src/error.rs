//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use event_bus::EventBusError;
use orders::OrderError;
use payments::PaymentError;
use thiserror::Error;

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Order storage error: {0}")]
    Orders(#[from] orders::RepositoryError),

    #[error("Payment storage error: {0}")]
    Payments(#[from] payments::RepositoryError),

    #[error("Event bus error: {0}")]
    Bus(#[from] EventBusError),
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Order ledger error.
    Order(OrderError),
    /// Payment adapter error.
    Payment(PaymentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Order(err) => order_error_to_response(err),
            ApiError::Payment(err) => payment_error_to_response(err),
        };

        metrics::counter!("api_errors_total", "status" => status.as_u16().to_string()).increment(1);
        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String) {
    match &err {
        OrderError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        OrderError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        OrderError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn payment_error_to_response(err: PaymentError) -> (StatusCode, String) {
    match &err {
        PaymentError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        PaymentError::Configuration(_)
        | PaymentError::Gateway(_)
        | PaymentError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Payment(err)
    }
}
