//! System endpoints: health check, package catalog.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::{CATALOG, CreditPackage};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    store: &'static str,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health, version and current timestamp. Reports 503 when the ledger store does not answer.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Ledger store unavailable", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (code, status, store) = match state.ledger.health().await {
        Ok(()) => (StatusCode::OK, "healthy", "ok"),
        Err(err) => {
            tracing::warn!(error = %err, "health check: store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
        }
    };
    (
        code,
        Json(HealthResponse {
            status,
            store,
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Pricing summary.
#[derive(Debug, Serialize, ToSchema)]
pub struct PackagesResponse {
    /// Credits charged per generation.
    generation_cost: i64,
    /// Credits granted once to new accounts.
    signup_bonus: i64,
    /// Packages on sale.
    packages: Vec<CreditPackage>,
}

/// `GET /config/packages`: Credit package catalog.
#[utoipa::path(
    get,
    path = "/config/packages",
    tag = "System",
    summary = "List credit packages",
    description = "Returns the packages on sale together with the generation cost and signup bonus in effect.",
    responses(
        (status = 200, description = "Package catalog", body = PackagesResponse),
    )
)]
pub async fn packages_handler(State(state): State<AppState>) -> impl IntoResponse {
    let rules = state.rules();
    Json(PackagesResponse {
        generation_cost: rules.generation_cost,
        signup_bonus: rules.signup_bonus,
        packages: CATALOG.to_vec(),
    })
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/packages", get(packages_handler))
}
