//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use bookline_types::error::BookingError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Booking domain errors.
    Booking(BookingError),
    /// Validation error on the request itself.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        AppError::Booking(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Booking(BookingError::ProviderNotFound) => (
                StatusCode::NOT_FOUND,
                "PROVIDER_NOT_FOUND",
                "Provider not found".to_string(),
            ),
            AppError::Booking(BookingError::ReservationNotFound) => (
                StatusCode::NOT_FOUND,
                "RESERVATION_NOT_FOUND",
                "Reservation not found".to_string(),
            ),
            AppError::Booking(e @ BookingError::Conflict(_)) => {
                (StatusCode::CONFLICT, "SLOT_UNAVAILABLE", e.to_string())
            }
            AppError::Booking(e @ BookingError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", e.to_string())
            }
            AppError::Booking(e @ BookingError::PaymentMismatch(_)) => {
                (StatusCode::CONFLICT, "PAYMENT_MISMATCH", e.to_string())
            }
            AppError::Booking(e @ BookingError::InvalidTimeRange(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_TIME_RANGE", e.to_string())
            }
            AppError::Booking(e @ BookingError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Booking(e @ BookingError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                e.to_string(),
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
