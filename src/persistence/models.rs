//! Database row models for the ledger tables.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{Account, Generation, Purchase, PurchaseStatus, UserId, UserProfile};
use crate::error::GatewayError;

/// Column list matching [`AccountRow`].
pub const ACCOUNT_COLUMNS: &str = "user_id, username, first_name, last_name, balance, \
     total_generations, signup_bonus_granted, created_at, last_active";

/// Column list matching [`GenerationRow`].
pub const GENERATION_COLUMNS: &str = "id, user_id, request_id, prompt, negative_prompt, \
     image_url, asset_id, cost, created_at";

/// Column list matching [`PurchaseRow`].
pub const PURCHASE_COLUMNS: &str = "id, user_id, package_id, price_minor, credits, payment_id, \
     status, created_at, paid_at";

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
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
    /// Generation counter.
    pub total_generations: i64,
    /// Bonus flag.
    pub signup_bonus_granted: bool,
    /// First contact.
    pub created_at: DateTime<Utc>,
    /// Last activity.
    pub last_active: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            user_id: UserId::new(row.user_id),
            profile: UserProfile {
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
            },
            balance: row.balance,
            total_generations: row.total_generations,
            signup_bonus_granted: row.signup_bonus_granted,
            created_at: row.created_at,
            last_active: row.last_active,
        }
    }
}

/// A row from the `generations` table.
#[derive(Debug, Clone, FromRow)]
pub struct GenerationRow {
    /// Row id.
    pub id: i64,
    /// Platform user id.
    pub user_id: i64,
    /// Originating request.
    pub request_id: Option<Uuid>,
    /// Prompt text.
    pub prompt: String,
    /// Negative prompt.
    pub negative_prompt: Option<String>,
    /// Image locator.
    pub image_url: String,
    /// Provider asset id.
    pub asset_id: Option<String>,
    /// Credits charged.
    pub cost: i64,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

impl From<GenerationRow> for Generation {
    fn from(row: GenerationRow) -> Self {
        Self {
            id: row.id,
            user_id: UserId::new(row.user_id),
            request_id: row.request_id,
            prompt: row.prompt,
            negative_prompt: row.negative_prompt,
            image_url: row.image_url,
            asset_id: row.asset_id,
            cost: row.cost,
            created_at: row.created_at,
        }
    }
}

/// A row from the `purchases` table.
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseRow {
    /// Row id.
    pub id: i64,
    /// Platform user id.
    pub user_id: i64,
    /// Package key.
    pub package_id: String,
    /// Price in minor units.
    pub price_minor: i64,
    /// Credits to grant.
    pub credits: i64,
    /// Payment identifier.
    pub payment_id: String,
    /// Raw status column.
    pub status: String,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
    /// Settlement time.
    pub paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = GatewayError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<PurchaseStatus>()
            .map_err(GatewayError::Internal)?;
        Ok(Self {
            id: row.id,
            user_id: UserId::new(row.user_id),
            package_id: row.package_id,
            price_minor: row.price_minor,
            credits: row.credits,
            payment_id: row.payment_id,
            status,
            created_at: row.created_at,
            paid_at: row.paid_at,
        })
    }
}
