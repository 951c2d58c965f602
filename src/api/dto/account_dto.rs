//! Account DTOs: upsert, onboarding, stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Account, UserProfile};

/// Request body for `PUT /users/{user_id}` and `POST /users/{user_id}/start`.
///
/// All fields are optional; absent fields are stored as `NULL`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpsertAccountRequest {
    /// Platform handle.
    pub username: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
}

impl From<UpsertAccountRequest> for UserProfile {
    fn from(req: UpsertAccountRequest) -> Self {
        Self {
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

/// A ledger account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountDto {
    /// Platform user id.
    pub user_id: i64,
    /// Platform handle.
    pub username: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Remaining credits.
    pub balance: i64,
    /// Number of recorded generations.
    pub total_generations: i64,
    /// Whether the signup bonus was already granted.
    pub signup_bonus_granted: bool,
    /// First contact.
    pub created_at: DateTime<Utc>,
    /// Last activity.
    pub last_active: DateTime<Utc>,
}

impl From<Account> for AccountDto {
    fn from(account: Account) -> Self {
        Self {
            user_id: account.user_id.as_i64(),
            username: account.profile.username,
            first_name: account.profile.first_name,
            last_name: account.profile.last_name,
            balance: account.balance,
            total_generations: account.total_generations,
            signup_bonus_granted: account.signup_bonus_granted,
            created_at: account.created_at,
            last_active: account.last_active,
        }
    }
}

/// Response body for `POST /users/{user_id}/start`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartSessionResponse {
    /// The account after onboarding.
    pub account: AccountDto,
    /// Whether this call granted the signup bonus.
    pub bonus_granted: bool,
}

/// Response body for `POST /users/{user_id}/signup-bonus`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SignupBonusResponse {
    /// Platform user id.
    pub user_id: i64,
    /// Whether this call granted the bonus.
    pub granted: bool,
    /// Balance after the call.
    pub balance: i64,
}

/// Response body for `GET /users/{user_id}/stats`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Platform user id.
    pub user_id: i64,
    /// Remaining credits.
    pub balance: i64,
    /// Number of generation records.
    pub generation_count: i64,
}
