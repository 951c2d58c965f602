//! Purchase intents and their settlement status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;

/// Settlement status of a purchase.
///
/// Only `Pending` is ever written by this service; `Paid` is set by an
/// external settlement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Awaiting payment capture.
    Pending,
    /// Payment captured and credits granted.
    Paid,
}

impl PurchaseStatus {
    /// Returns the value stored in the `status` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            other => Err(format!("unknown purchase status: {other}")),
        }
    }
}

/// A recorded purchase intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Purchase {
    /// Row id.
    pub id: i64,
    /// Owning account.
    pub user_id: UserId,
    /// Catalog package key (e.g. `"50"`).
    pub package_id: String,
    /// Price in minor currency units.
    pub price_minor: i64,
    /// Credits granted once paid.
    pub credits: i64,
    /// Unique idempotent payment identifier.
    pub payment_id: String,
    /// Settlement status.
    pub status: PurchaseStatus,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
    /// Settlement time, if settled.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Input to `record_purchase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    /// Owning account.
    pub user_id: UserId,
    /// Catalog package key.
    pub package_id: String,
    /// Price in minor currency units.
    pub price_minor: i64,
    /// Credits to grant on settlement.
    pub credits: i64,
    /// Unique payment identifier.
    pub payment_id: String,
}

impl NewPurchase {
    pub(crate) fn into_pending(self, id: i64, created_at: DateTime<Utc>) -> Purchase {
        Purchase {
            id,
            user_id: self.user_id,
            package_id: self.package_id,
            price_minor: self.price_minor,
            credits: self.credits,
            payment_id: self.payment_id,
            status: PurchaseStatus::Pending,
            created_at,
            paid_at: None,
        }
    }
}

/// Builds the default payment identifier: `{user_id}_{unix_seconds}`.
///
/// Two intents from the same user within one second collide and the
/// second is rejected as a duplicate payment.
#[must_use]
pub fn default_payment_id(user_id: UserId, at: DateTime<Utc>) -> String {
    format!("{user_id}_{}", at.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_round_trips_through_column_value() {
        for status in [PurchaseStatus::Pending, PurchaseStatus::Paid] {
            assert_eq!(status.as_str().parse::<PurchaseStatus>(), Ok(status));
        }
        assert!("refunded".parse::<PurchaseStatus>().is_err());
    }

    #[test]
    fn payment_id_uses_unix_seconds() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single();
        assert_eq!(
            at.map(|at| default_payment_id(UserId::new(42), at)),
            Some("42_1700000000".to_string())
        );
    }
}
