//! Provider catalog handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use bookline_types::provider::{CreateProviderRequest, ProviderId, UpdateProviderRequest};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

fn parse_provider_id(raw: &str) -> Result<ProviderId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid provider id '{raw}'")))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProviderListQuery {
    /// When true, only active providers are returned.
    #[serde(default)]
    pub active: bool,
}

/// POST /api/v1/providers - Register a provider.
pub async fn create_provider(
    State(state): State<AppState>,
    Json(body): Json<CreateProviderRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let provider = state.catalog_service.create_provider(body).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let provider_json = serde_json::to_value(&provider)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(provider_json, request_id, elapsed)
        .with_link("self", &format!("/api/v1/providers/{}", provider.id))
        .with_link(
            "schedule",
            &format!("/api/v1/providers/{}/schedule", provider.id),
        );

    Ok(Json(resp))
}

/// GET /api/v1/providers - List providers.
pub async fn list_providers(
    State(state): State<AppState>,
    Query(query): Query<ProviderListQuery>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let providers = state.catalog_service.list_providers(query.active).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let providers_json = providers
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let resp = ApiResponse::success(providers_json, request_id, elapsed)
        .with_link("self", "/api/v1/providers");

    Ok(Json(resp))
}

/// GET /api/v1/providers/:id - Get a provider by ID.
pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_provider_id(&id)?;
    let provider = state.catalog_service.get_provider(&id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let provider_json = serde_json::to_value(&provider)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(provider_json, request_id, elapsed)
        .with_link("self", &format!("/api/v1/providers/{}", provider.id))
        .with_link(
            "slots",
            &format!("/api/v1/providers/{}/slots", provider.id),
        );

    Ok(Json(resp))
}

/// PUT /api/v1/providers/:id - Partially update a provider.
pub async fn update_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateProviderRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id = parse_provider_id(&id)?;
    let updated = state.catalog_service.update_provider(&id, body).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    let provider_json = serde_json::to_value(&updated)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(provider_json, request_id, elapsed)
        .with_link("self", &format!("/api/v1/providers/{}", updated.id));

    Ok(Json(resp))
}
