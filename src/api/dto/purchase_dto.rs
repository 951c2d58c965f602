//! Purchase DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Purchase, PurchaseStatus};

/// Request body for `POST /users/{user_id}/purchases`.
///
/// With only `package_id`, the package is looked up in the catalog. When
/// both `credits` and `price_minor` are given, the purchase is recorded
/// as-is under `package_id`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePurchaseRequest {
    /// Catalog key (`"10"`, `"50"`, `"200"`; a `buy_` prefix is accepted).
    pub package_id: String,
    /// External payment id; derived from the user id and time if absent.
    #[serde(default)]
    pub payment_id: Option<String>,
    /// Credits to grant on settlement, overriding the catalog.
    #[serde(default)]
    pub credits: Option<i64>,
    /// Price in minor units, overriding the catalog.
    #[serde(default)]
    pub price_minor: Option<i64>,
}

/// A recorded purchase.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseDto {
    /// Record id.
    pub id: i64,
    /// Platform user id.
    pub user_id: i64,
    /// Package key.
    pub package_id: String,
    /// Price in minor currency units.
    pub price_minor: i64,
    /// Credits granted on settlement.
    pub credits: i64,
    /// External payment id.
    pub payment_id: String,
    /// Settlement state.
    pub status: PurchaseStatus,
    /// Record time.
    pub created_at: DateTime<Utc>,
    /// Settlement time.
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Purchase> for PurchaseDto {
    fn from(p: Purchase) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id.as_i64(),
            package_id: p.package_id,
            price_minor: p.price_minor,
            credits: p.credits,
            payment_id: p.payment_id,
            status: p.status,
            created_at: p.created_at,
            paid_at: p.paid_at,
        }
    }
}

/// Response body for `GET /users/{user_id}/purchases`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseListResponse {
    /// Most recent first.
    pub data: Vec<PurchaseDto>,
}
