//! Ledger account: identity, display fields and running counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Display fields reported by the chat platform on every contact.
///
/// Last write wins: each `ensure_account` call overwrites the stored
/// values with whatever the platform reported this time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Platform handle, if the user has one.
    pub username: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
}

/// A ledger account as stored in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Platform user id (unique, immutable).
    pub user_id: UserId,
    /// Latest display fields.
    pub profile: UserProfile,
    /// Remaining generation credits.
    pub balance: i64,
    /// Running count of recorded generations. Never decreases.
    pub total_generations: i64,
    /// Whether the one-time signup bonus has been claimed.
    pub signup_bonus_granted: bool,
    /// First contact.
    pub created_at: DateTime<Utc>,
    /// Last contact or balance change.
    pub last_active: DateTime<Utc>,
}

impl Account {
    /// Creates a fresh account with a zero balance.
    #[must_use]
    pub fn new(user_id: UserId, profile: UserProfile) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            profile,
            balance: 0,
            total_generations: 0,
            signup_bonus_granted: false,
            created_at: now,
            last_active: now,
        }
    }
}

/// Balance summary shown by the `/balance` command of the chat front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    /// Remaining credits.
    pub balance: i64,
    /// Number of generation rows recorded for the user.
    pub generation_count: i64,
}
