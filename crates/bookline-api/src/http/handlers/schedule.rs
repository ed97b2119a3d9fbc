//! Schedule administration and slot computation handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use serde::Deserialize;

use bookline_types::provider::ProviderId;
use bookline_types::schedule::{TimeRange, Weekday, WeeklyTemplate};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

fn parse_provider_id(raw: &str) -> Result<ProviderId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid provider id '{raw}'")))
}

fn parse_weekday(raw: &str) -> Result<Weekday, AppError> {
    raw.parse().map_err(AppError::Validation)
}

/// Request body for setting one weekday's working hours.
#[derive(Debug, Deserialize)]
pub struct SetHoursBody {
    /// "HH:MM"
    pub start: String,
    /// "HH:MM"
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    /// "YYYY-MM-DD"
    pub date: String,
}

/// GET /api/v1/providers/:id/schedule - Full weekly schedule.
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WeeklyTemplate>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_provider_id(&id)?;
    let week = state.catalog_service.weekly_schedule(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(week, request_id, elapsed)
        .with_link("self", &format!("/api/v1/providers/{id}/schedule"));

    Ok(Json(resp))
}

/// PUT /api/v1/providers/:id/schedule/:weekday - Set one weekday's hours.
pub async fn set_day(
    State(state): State<AppState>,
    Path((id, weekday)): Path<(String, String)>,
    Json(body): Json<SetHoursBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_provider_id(&id)?;
    let weekday = parse_weekday(&weekday)?;
    let range = TimeRange::parse(&body.start, &body.end).map_err(AppError::Validation)?;

    state
        .catalog_service
        .set_working_hours(&id, weekday, range)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(
        serde_json::json!({ "weekday": weekday, "hours": range }),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

/// DELETE /api/v1/providers/:id/schedule/:weekday - Mark a day off.
pub async fn clear_day(
    State(state): State<AppState>,
    Path((id, weekday)): Path<(String, String)>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_provider_id(&id)?;
    let weekday = parse_weekday(&weekday)?;

    state
        .catalog_service
        .clear_working_hours(&id, weekday)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(
        serde_json::json!({ "weekday": weekday, "hours": null }),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

/// POST /api/v1/providers/:id/schedule/default - Apply the default weekday
/// template (Monday through Friday, 09:00-17:00).
pub async fn apply_default(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WeeklyTemplate>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_provider_id(&id)?;
    let template = WeeklyTemplate::default();
    state
        .catalog_service
        .apply_weekly_template(&id, &template)
        .await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(template, request_id, elapsed)
        .with_link("self", &format!("/api/v1/providers/{id}/schedule"));

    Ok(Json(resp))
}

/// GET /api/v1/providers/:id/slots?date=YYYY-MM-DD - Bookable slots.
pub async fn get_slots(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_provider_id(&id)?;
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|e| AppError::Validation(format!("invalid date '{}': {e}", query.date)))?;

    let slots = state.booking_service.compute_slots(&id, date).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let slots_json = slots
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let resp = ApiResponse::success(slots_json, request_id, elapsed)
        .with_link("reserve", "/api/v1/reservations");

    Ok(Json(resp))
}
