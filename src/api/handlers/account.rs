//! Account handlers: upsert, onboarding, signup bonus, stats.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    AccountDto, SignupBonusResponse, StartSessionResponse, StatsResponse, UpsertAccountRequest,
};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, GatewayError};

/// `PUT /users/{user_id}`: Create or refresh an account.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] if the store is unavailable.
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    tag = "Accounts",
    summary = "Create or refresh an account",
    description = "Creates the account on first contact with a zero balance; otherwise overwrites the display fields and refreshes last-active. Never changes the balance.",
    params(("user_id" = i64, Path, description = "Platform user id")),
    request_body = UpsertAccountRequest,
    responses(
        (status = 200, description = "Account state", body = AccountDto),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn upsert_account(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<UpsertAccountRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let account = state
        .ledger
        .ensure_account(UserId::new(user_id), &req.into())
        .await?;
    Ok(Json(AccountDto::from(account)))
}

/// `POST /users/{user_id}/start`: Onboarding: upsert plus signup bonus.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] if the store is unavailable.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/start",
    tag = "Accounts",
    summary = "Start a session",
    description = "Ensures the account exists and grants the configured signup bonus if it was never granted.",
    params(("user_id" = i64, Path, description = "Platform user id")),
    request_body = UpsertAccountRequest,
    responses(
        (status = 200, description = "Account after onboarding", body = StartSessionResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn start_session(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<UpsertAccountRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let bonus = state.rules().signup_bonus;
    let outcome = state
        .ledger
        .start_session(UserId::new(user_id), &req.into(), bonus)
        .await?;
    Ok(Json(StartSessionResponse {
        account: outcome.account.into(),
        bonus_granted: outcome.bonus_granted,
    }))
}

/// `POST /users/{user_id}/signup-bonus`: Grant the one-time bonus.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidAmount`] if the configured bonus is zero
/// or [`GatewayError::PersistenceError`] if the store is unavailable.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/signup-bonus",
    tag = "Accounts",
    summary = "Grant signup bonus",
    description = "Grants the configured signup bonus if this account never received it. `granted` is false on every later call and for unknown users.",
    params(("user_id" = i64, Path, description = "Platform user id")),
    responses(
        (status = 200, description = "Bonus outcome", body = SignupBonusResponse),
        (status = 400, description = "Bonus disabled", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn grant_signup_bonus(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    let user = UserId::new(user_id);
    let granted = state
        .ledger
        .grant_signup_bonus_if_new(user, state.rules().signup_bonus)
        .await?;
    let balance = state.ledger.get_balance(user).await?;
    Ok(Json(SignupBonusResponse {
        user_id,
        granted,
        balance,
    }))
}

/// `GET /users/{user_id}/stats`: Balance and generation count.
///
/// # Errors
///
/// Returns [`GatewayError::UserNotFound`] for an unknown user.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/stats",
    tag = "Accounts",
    summary = "Get account stats",
    params(("user_id" = i64, Path, description = "Platform user id")),
    responses(
        (status = 200, description = "Account stats", body = StatsResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, GatewayError> {
    let stats = state
        .ledger
        .get_stats(UserId::new(user_id))
        .await?
        .ok_or(GatewayError::UserNotFound(user_id))?;
    Ok(Json(StatsResponse {
        user_id,
        balance: stats.balance,
        generation_count: stats.generation_count,
    }))
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}", put(upsert_account))
        .route("/users/{user_id}/start", post(start_session))
        .route("/users/{user_id}/signup-bonus", post(grant_signup_bonus))
        .route("/users/{user_id}/stats", get(get_stats))
}
