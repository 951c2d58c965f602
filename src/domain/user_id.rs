//! Type-safe platform user identifier.
//!
//! [`UserId`] wraps the numeric id the chat platform assigns to a user, so
//! that it cannot be confused with internal row ids or amounts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform-assigned identity of a ledger account holder.
///
/// Unique and immutable: it is the lookup key for balances, generations
/// and purchases, and the subscription target on the WebSocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wraps a raw platform id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw platform id, as stored in the `user_id` columns.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}
