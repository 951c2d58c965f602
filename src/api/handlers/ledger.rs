//! Credit ledger handlers: balance, top-up, debit.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{AmountRequest, BalanceResponse, DebitResponse};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /users/{user_id}/balance`: Current balance.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] if the store is unavailable.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/balance",
    tag = "Ledger",
    summary = "Get balance",
    description = "Returns the current balance; 0 for unknown users.",
    params(("user_id" = i64, Path, description = "Platform user id")),
    responses(
        (status = 200, description = "Balance", body = BalanceResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    let balance = state.ledger.get_balance(UserId::new(user_id)).await?;
    Ok(Json(BalanceResponse { user_id, balance }))
}

/// `POST /users/{user_id}/credits`: Add credits (manual top-up).
///
/// # Errors
///
/// Returns [`GatewayError::InvalidAmount`] for a non-positive amount and
/// [`GatewayError::UserNotFound`] for an unknown user.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/credits",
    tag = "Ledger",
    summary = "Add credits",
    params(("user_id" = i64, Path, description = "Platform user id")),
    request_body = AmountRequest,
    responses(
        (status = 200, description = "New balance", body = BalanceResponse),
        (status = 400, description = "Non-positive amount", body = ErrorResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
    )
)]
pub async fn add_credits(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<AmountRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let balance = state
        .ledger
        .add_credits(UserId::new(user_id), req.amount)
        .await?;
    Ok(Json(BalanceResponse { user_id, balance }))
}

/// `POST /users/{user_id}/debits`: Conditionally remove credits.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidAmount`] for a non-positive amount.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/debits",
    tag = "Ledger",
    summary = "Deduct credits",
    description = "Deducts the amount only if the balance covers it. `deducted` is false and the balance unchanged otherwise.",
    params(("user_id" = i64, Path, description = "Platform user id")),
    request_body = AmountRequest,
    responses(
        (status = 200, description = "Deduction outcome", body = DebitResponse),
        (status = 400, description = "Non-positive amount", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn deduct_credits(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<AmountRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let user = UserId::new(user_id);
    let deducted = state.ledger.deduct_credits(user, req.amount).await?;
    let balance = state.ledger.get_balance(user).await?;
    Ok(Json(DebitResponse {
        user_id,
        deducted,
        balance,
    }))
}

/// Ledger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}/balance", get(get_balance))
        .route("/users/{user_id}/credits", post(add_credits))
        .route("/users/{user_id}/debits", post(deduct_credits))
}
