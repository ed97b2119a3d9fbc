//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Provider catalog
        .route("/providers", post(handlers::provider::create_provider))
        .route("/providers", get(handlers::provider::list_providers))
        .route("/providers/{id}", get(handlers::provider::get_provider))
        .route("/providers/{id}", put(handlers::provider::update_provider))
        // Weekly schedule
        .route(
            "/providers/{id}/schedule",
            get(handlers::schedule::get_schedule),
        )
        .route(
            "/providers/{id}/schedule/default",
            post(handlers::schedule::apply_default),
        )
        .route(
            "/providers/{id}/schedule/{weekday}",
            put(handlers::schedule::set_day),
        )
        .route(
            "/providers/{id}/schedule/{weekday}",
            delete(handlers::schedule::clear_day),
        )
        // Slot computation
        .route("/providers/{id}/slots", get(handlers::schedule::get_slots))
        // Reservation lifecycle
        .route(
            "/reservations",
            post(handlers::reservation::create_reservation),
        )
        .route(
            "/reservations",
            get(handlers::reservation::list_reservations),
        )
        .route(
            "/reservations/{id}",
            get(handlers::reservation::get_reservation),
        )
        .route(
            "/reservations/{id}/finalize",
            post(handlers::reservation::finalize_reservation),
        )
        .route(
            "/reservations/{id}/payment",
            post(handlers::reservation::record_payment),
        )
        .route(
            "/reservations/{id}/cancel",
            post(handlers::reservation::cancel_reservation),
        )
        .route(
            "/reservations/{id}/reschedule",
            post(handlers::reservation::reschedule_reservation),
        )
        .route(
            "/reservations/{id}/complete",
            post(handlers::reservation::complete_reservation),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
