//! Persistence layer: the ledger store.
//!
//! [`LedgerStore`] is the small set of named operations the ledger needs
//! from a relational store. [`PostgresLedgerStore`] is the production
//! implementation over `sqlx::PgPool`; [`MemoryLedgerStore`] keeps the same
//! contract in process for tests and local development.
//!
//! Every operation that changes a balance is a single statement or a single
//! transaction, so no caller ever performs a read-modify-write on balances.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Account, Generation, NewGeneration, NewPurchase, Purchase, UserId, UserProfile, UserStats,
};
use crate::error::GatewayError;

pub use memory::MemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

/// Outcome of an account upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertedAccount {
    /// The account after the upsert.
    pub account: Account,
    /// `true` if this call created the account.
    pub created: bool,
}

/// Durable store for balances and the generation/purchase history.
#[async_trait]
pub trait LedgerStore: Send + Sync + std::fmt::Debug {
    /// Creates the account or refreshes its display fields and
    /// `last_active`. Never touches the balance.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn upsert_account(
        &self,
        user_id: UserId,
        profile: &UserProfile,
    ) -> Result<UpsertedAccount, GatewayError>;

    /// Loads an account.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn find_account(&self, user_id: UserId) -> Result<Option<Account>, GatewayError>;

    /// Adds `amount` and sets the bonus flag, only if the flag is unset.
    /// Returns the new balance when the bonus was granted.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn claim_signup_bonus(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> Result<Option<i64>, GatewayError>;

    /// Unconditionally adds `amount`. Returns the new balance, or `None`
    /// for an unknown user.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn add_credits(&self, user_id: UserId, amount: i64)
    -> Result<Option<i64>, GatewayError>;

    /// Subtracts `amount` only if the balance covers it, as one indivisible
    /// operation. Returns whether the balance changed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn deduct_credits(&self, user_id: UserId, amount: i64) -> Result<bool, GatewayError>;

    /// Credits `amount` back unless `request_id` was already refunded.
    /// Returns the new balance when applied, `None` for a repeated key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UserNotFound`] for an unknown user and
    /// [`GatewayError::PersistenceError`] on store failure.
    async fn refund_credits(
        &self,
        user_id: UserId,
        amount: i64,
        request_id: Uuid,
    ) -> Result<Option<i64>, GatewayError>;

    /// Appends a generation and bumps the account's generation counter in
    /// one transaction. `None` if the user cannot be resolved.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the request id was already
    /// recorded and [`GatewayError::PersistenceError`] on store failure.
    async fn insert_generation(
        &self,
        generation: NewGeneration,
    ) -> Result<Option<Generation>, GatewayError>;

    /// Most recent generations first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn recent_generations(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Generation>, GatewayError>;

    /// Balance and generation count, `None` for an unknown user.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn stats(&self, user_id: UserId) -> Result<Option<UserStats>, GatewayError>;

    /// Appends a pending purchase. `None` if the user cannot be resolved.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DuplicatePayment`] if the payment id exists
    /// and [`GatewayError::PersistenceError`] on store failure.
    async fn insert_purchase(&self, purchase: NewPurchase)
    -> Result<Option<Purchase>, GatewayError>;

    /// Most recent purchases first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn recent_purchases(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Purchase>, GatewayError>;

    /// Round trip to the store, for health checks.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the store is unreachable.
    async fn ping(&self) -> Result<(), GatewayError>;

    /// Releases pooled connections. Called once at shutdown.
    async fn close(&self) {}
}
