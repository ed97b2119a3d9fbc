//! Reservation lifecycle handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::NaiveDateTime;
use serde::Deserialize;

use bookline_types::reservation::{CreateReservationRequest, ReservationId, SubjectId};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

fn parse_reservation_id(raw: &str) -> Result<ReservationId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid reservation id '{raw}'")))
}

#[derive(Debug, Deserialize)]
pub struct ReservationListQuery {
    /// Subject whose reservations to list.
    pub subject: String,
}

/// Payment outcome reported by the payment collaborator.
#[derive(Debug, Deserialize)]
pub struct PaymentOutcomeBody {
    pub success: bool,
    pub payment_ref: String,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleBody {
    /// New start, naive wall clock ("YYYY-MM-DDTHH:MM:SS").
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}

/// POST /api/v1/reservations - Create a PENDING reservation.
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(body): Json<CreateReservationRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let reservation = state.booking_service.create(body).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(to_json(&reservation)?, request_id, elapsed)
        .with_link("self", &format!("/api/v1/reservations/{}", reservation.id))
        .with_link(
            "finalize",
            &format!("/api/v1/reservations/{}/finalize", reservation.id),
        );

    Ok(Json(resp))
}

/// GET /api/v1/reservations/:id - Get a reservation.
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_reservation_id(&id)?;
    let reservation = state.booking_service.get_reservation(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(to_json(&reservation)?, request_id, elapsed)
        .with_link("self", &format!("/api/v1/reservations/{}", reservation.id));

    Ok(Json(resp))
}

/// GET /api/v1/reservations?subject=:id - Reservations made by a subject.
pub async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<ReservationListQuery>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let subject: SubjectId = query
        .subject
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid subject id '{}'", query.subject)))?;

    let reservations = state.booking_service.reservations_for_subject(&subject).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let reservations_json = reservations
        .iter()
        .map(to_json)
        .collect::<Result<Vec<_>, _>>()?;

    let resp = ApiResponse::success(reservations_json, request_id, elapsed)
        .with_link("self", &format!("/api/v1/reservations?subject={subject}"));

    Ok(Json(resp))
}

/// POST /api/v1/reservations/:id/finalize - Confirm a free reservation or
/// move a paid one to PAYMENT_PENDING.
pub async fn finalize_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_reservation_id(&id)?;
    let reservation = state.booking_service.finalize(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(to_json(&reservation)?, request_id, elapsed)
        .with_link("self", &format!("/api/v1/reservations/{}", reservation.id));

    Ok(Json(resp))
}

/// POST /api/v1/reservations/:id/payment - Record an asynchronous payment outcome.
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PaymentOutcomeBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_reservation_id(&id)?;
    let reservation = state
        .booking_service
        .record_payment_outcome(&id, body.success, &body.payment_ref)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(to_json(&reservation)?, request_id, elapsed)
        .with_link("self", &format!("/api/v1/reservations/{}", reservation.id));

    Ok(Json(resp))
}

/// POST /api/v1/reservations/:id/cancel - Cancel an active reservation.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_reservation_id(&id)?;
    let reservation = state.booking_service.cancel(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(to_json(&reservation)?, request_id, elapsed);

    Ok(Json(resp))
}

/// POST /api/v1/reservations/:id/reschedule - Move a confirmed reservation.
pub async fn reschedule_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RescheduleBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_reservation_id(&id)?;
    let reservation = state
        .booking_service
        .reschedule(&id, body.start, body.duration_minutes)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(to_json(&reservation)?, request_id, elapsed)
        .with_link("self", &format!("/api/v1/reservations/{}", reservation.id));

    Ok(Json(resp))
}

/// POST /api/v1/reservations/:id/complete - Mark a past confirmed
/// reservation as completed.
pub async fn complete_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_reservation_id(&id)?;
    let reservation = state.booking_service.complete(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(to_json(&reservation)?, request_id, elapsed);

    Ok(Json(resp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_malformed_reservation_id_is_bad_request() {
        let err = parse_reservation_id("not-a-uuid").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
