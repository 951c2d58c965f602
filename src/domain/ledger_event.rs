//! Domain events reflecting ledger mutations.
//!
//! Every successful balance change or history append emits a
//! [`LedgerEvent`] through the [`super::EventBus`]. Events are forwarded to
//! WebSocket subscribers so the chat front-end can notify the user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{PurchaseStatus, UserId};

/// Why credits were added to a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditReason {
    /// One-time bonus for a new account.
    SignupBonus,
    /// Manual or settled top-up.
    TopUp,
}

/// Domain event emitted after every ledger mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// First contact from a user.
    AccountCreated {
        /// Account holder.
        user_id: UserId,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Credits were added to a balance.
    CreditsAdded {
        /// Account holder.
        user_id: UserId,
        /// Credits added.
        amount: i64,
        /// Balance after the change.
        balance: i64,
        /// Source of the credits.
        reason: CreditReason,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A conditional deduction succeeded.
    CreditsDeducted {
        /// Account holder.
        user_id: UserId,
        /// Credits removed.
        amount: i64,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A compensating refund was applied for a failed request.
    CreditsRefunded {
        /// Account holder.
        user_id: UserId,
        /// Credits restored.
        amount: i64,
        /// Request whose charge was reversed.
        request_id: Uuid,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A generation was appended to the history.
    GenerationRecorded {
        /// Account holder.
        user_id: UserId,
        /// Generation row id.
        generation_id: i64,
        /// Produced image locator.
        image_url: String,
        /// Credits charged.
        cost: i64,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A purchase intent was recorded.
    PurchaseRecorded {
        /// Account holder.
        user_id: UserId,
        /// Payment identifier.
        payment_id: String,
        /// Catalog package key.
        package_id: String,
        /// Settlement status at recording time.
        status: PurchaseStatus,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// Returns the account this event concerns.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::AccountCreated { user_id, .. }
            | Self::CreditsAdded { user_id, .. }
            | Self::CreditsDeducted { user_id, .. }
            | Self::CreditsRefunded { user_id, .. }
            | Self::GenerationRecorded { user_id, .. }
            | Self::PurchaseRecorded { user_id, .. } => *user_id,
        }
    }

    /// Returns the serialized `event_type` discriminator.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::AccountCreated { .. } => "account_created",
            Self::CreditsAdded { .. } => "credits_added",
            Self::CreditsDeducted { .. } => "credits_deducted",
            Self::CreditsRefunded { .. } => "credits_refunded",
            Self::GenerationRecorded { .. } => "generation_recorded",
            Self::PurchaseRecorded { .. } => "purchase_recorded",
        }
    }
}
