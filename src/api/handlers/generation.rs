//! Generation handlers: paid generation and history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    GenerateRequest, GenerateResponse, GenerationDto, GenerationListResponse, HistoryParams,
};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /users/{user_id}/generations`: Generate one image and charge for it.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for a bad prompt,
/// [`GatewayError::InsufficientBalance`] when the balance is too low and
/// [`GatewayError::Generation`] when the provider fails (the charge is
/// refunded).
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/generations",
    tag = "Generations",
    summary = "Generate an image",
    description = "Charges the generation cost, calls the image provider and records the result. A provider failure refunds the charge.",
    params(("user_id" = i64, Path, description = "Platform user id")),
    request_body = GenerateRequest,
    responses(
        (status = 201, description = "Image generated", body = GenerateResponse),
        (status = 400, description = "Prompt too short or too long", body = ErrorResponse),
        (status = 402, description = "Insufficient balance", body = ErrorResponse),
        (status = 422, description = "Rejected by content policy", body = ErrorResponse),
        (status = 429, description = "Provider rate limit", body = ErrorResponse),
        (status = 502, description = "Provider failure", body = ErrorResponse),
    )
)]
pub async fn create_generation(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let receipt = state
        .orchestrator
        .generate(
            UserId::new(user_id),
            &req.prompt,
            req.negative_prompt.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            generation: receipt.generation.into(),
            balance: receipt.balance,
        }),
    ))
}

/// `GET /users/{user_id}/generations`: Recent generations, newest first.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] if the store is unavailable.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/generations",
    tag = "Generations",
    summary = "List recent generations",
    params(("user_id" = i64, Path, description = "Platform user id"), HistoryParams),
    responses(
        (status = 200, description = "Generation history", body = GenerationListResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn list_generations(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let data = state
        .ledger
        .list_recent_generations(UserId::new(user_id), params.clamped())
        .await?
        .into_iter()
        .map(GenerationDto::from)
        .collect();
    Ok(Json(GenerationListResponse { data }))
}

/// Generation routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/users/{user_id}/generations",
        post(create_generation).get(list_generations),
    )
}
