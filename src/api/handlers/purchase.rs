//! Purchase handlers: pending purchase records.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{CreatePurchaseRequest, HistoryParams, PurchaseDto, PurchaseListResponse};
use crate::app_state::AppState;
use crate::domain::{NewPurchase, UserId, default_payment_id};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /users/{user_id}/purchases`: Record a pending purchase.
///
/// # Errors
///
/// Returns [`GatewayError::PackageNotFound`] for an unknown package,
/// [`GatewayError::DuplicatePayment`] for a reused payment id and
/// [`GatewayError::UserNotFound`] for an unknown user.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/purchases",
    tag = "Purchases",
    summary = "Record a pending purchase",
    description = "Records a purchase in `pending` state. Credits are not granted here; settlement happens outside this service.",
    params(("user_id" = i64, Path, description = "Platform user id")),
    request_body = CreatePurchaseRequest,
    responses(
        (status = 201, description = "Purchase recorded", body = PurchaseDto),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Unknown user or package", body = ErrorResponse),
        (status = 409, description = "Duplicate payment id", body = ErrorResponse),
    )
)]
pub async fn create_purchase(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<CreatePurchaseRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let user = UserId::new(user_id);
    let purchase = match (req.credits, req.price_minor) {
        (None, None) => {
            state
                .ledger
                .create_purchase_intent(user, &req.package_id, req.payment_id)
                .await?
        }
        (Some(credits), Some(price_minor)) => {
            let payment_id = req
                .payment_id
                .unwrap_or_else(|| default_payment_id(user, Utc::now()));
            state
                .ledger
                .record_purchase(NewPurchase {
                    user_id: user,
                    package_id: req.package_id,
                    price_minor,
                    credits,
                    payment_id,
                })
                .await?
        }
        _ => {
            return Err(GatewayError::InvalidRequest(
                "credits and price_minor must be given together".to_string(),
            ));
        }
    };

    Ok((StatusCode::CREATED, Json(PurchaseDto::from(purchase))))
}

/// `GET /users/{user_id}/purchases`: Recent purchases, newest first.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] if the store is unavailable.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/purchases",
    tag = "Purchases",
    summary = "List recent purchases",
    params(("user_id" = i64, Path, description = "Platform user id"), HistoryParams),
    responses(
        (status = 200, description = "Purchase history", body = PurchaseListResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let data = state
        .ledger
        .list_purchases(UserId::new(user_id), params.clamped())
        .await?
        .into_iter()
        .map(PurchaseDto::from)
        .collect();
    Ok(Json(PurchaseListResponse { data }))
}

/// Purchase routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/users/{user_id}/purchases",
        post(create_purchase).get(list_purchases),
    )
}
