//! Balance, credit and debit DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for `GET /users/{user_id}/balance` and `POST .../credits`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    /// Platform user id.
    pub user_id: i64,
    /// Current balance; 0 for unknown users.
    pub balance: i64,
}

/// Request body for `POST /users/{user_id}/credits` and `POST .../debits`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AmountRequest {
    /// Number of credits, strictly positive.
    pub amount: i64,
}

/// Response body for `POST /users/{user_id}/debits`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DebitResponse {
    /// Platform user id.
    pub user_id: i64,
    /// `false` when the balance did not cover the amount; nothing changed.
    pub deducted: bool,
    /// Balance after the call.
    pub balance: i64,
}
