//! Ledger service: accounts, balances, and the generation/purchase history.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Account, CreditReason, EventBus, Generation, LedgerEvent, NewGeneration, NewPurchase,
    Purchase, UserId, UserProfile, UserStats, default_payment_id, find_package,
};
use crate::error::GatewayError;
use crate::persistence::LedgerStore;

/// Upper bound for history page sizes.
pub const MAX_HISTORY_LIMIT: i64 = 50;

/// Result of the onboarding flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    /// The account after onboarding, balance included.
    pub account: Account,
    /// Whether this call granted the signup bonus.
    pub bonus_granted: bool,
}

/// Business rules over a [`LedgerStore`].
///
/// Validates inputs, delegates each operation to a single store call, and
/// emits a [`LedgerEvent`] for every mutation that took effect.
#[derive(Debug, Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    event_bus: EventBus,
}

impl LedgerService {
    /// Creates a new `LedgerService`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    // ---- Account manager ----

    /// Creates the account on first contact, otherwise refreshes its
    /// display fields and last-active time. Never modifies the balance.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    pub async fn ensure_account(
        &self,
        user_id: UserId,
        profile: &UserProfile,
    ) -> Result<Account, GatewayError> {
        let upserted = self.store.upsert_account(user_id, profile).await?;
        if upserted.created {
            tracing::info!(%user_id, "account created");
            let _ = self.event_bus.publish(LedgerEvent::AccountCreated {
                user_id,
                timestamp: upserted.account.created_at,
            });
        }
        Ok(upserted.account)
    }

    /// Grants `bonus` credits if the account has never received its signup
    /// bonus. Returns whether this call granted it.
    ///
    /// Eligibility is tracked by an explicit flag, so an account that spent
    /// its balance down to zero is not mistaken for a new one.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidAmount`] for a non-positive bonus and
    /// [`GatewayError::PersistenceError`] on store failure.
    pub async fn grant_signup_bonus_if_new(
        &self,
        user_id: UserId,
        bonus: i64,
    ) -> Result<bool, GatewayError> {
        Ok(self.claim_bonus(user_id, bonus).await?.is_some())
    }

    /// Claims the signup bonus, returning the balance it produced.
    async fn claim_bonus(&self, user_id: UserId, bonus: i64) -> Result<Option<i64>, GatewayError> {
        ensure_positive(bonus)?;
        let Some(balance) = self.store.claim_signup_bonus(user_id, bonus).await? else {
            return Ok(None);
        };

        tracing::info!(%user_id, bonus, balance, "signup bonus granted");
        let _ = self.event_bus.publish(LedgerEvent::CreditsAdded {
            user_id,
            amount: bonus,
            balance,
            reason: CreditReason::SignupBonus,
            timestamp: Utc::now(),
        });
        Ok(Some(balance))
    }

    /// Onboarding: [`Self::ensure_account`] followed by the signup bonus
    /// (skipped when `bonus` is zero).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidAmount`] for a negative bonus and
    /// [`GatewayError::PersistenceError`] on store failure.
    pub async fn start_session(
        &self,
        user_id: UserId,
        profile: &UserProfile,
        bonus: i64,
    ) -> Result<StartOutcome, GatewayError> {
        let mut account = self.ensure_account(user_id, profile).await?;
        if bonus == 0 {
            return Ok(StartOutcome {
                account,
                bonus_granted: false,
            });
        }
        let claimed = self.claim_bonus(user_id, bonus).await?;
        if let Some(balance) = claimed {
            account.balance = balance;
            account.signup_bonus_granted = true;
        }
        Ok(StartOutcome {
            account,
            bonus_granted: claimed.is_some(),
        })
    }

    // ---- Credit ledger ----

    /// Current balance; 0 for an unknown user.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    pub async fn get_balance(&self, user_id: UserId) -> Result<i64, GatewayError> {
        Ok(self
            .store
            .find_account(user_id)
            .await?
            .map_or(0, |account| account.balance))
    }

    /// Adds `amount` credits and returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidAmount`] for a non-positive or overflowing amount,
    /// [`GatewayError::UserNotFound`] for an unknown user and
    /// [`GatewayError::PersistenceError`] on store failure.
    pub async fn add_credits(&self, user_id: UserId, amount: i64) -> Result<i64, GatewayError> {
        ensure_positive(amount)?;
        let balance = self
            .store
            .add_credits(user_id, amount)
            .await?
            .ok_or(GatewayError::UserNotFound(user_id.as_i64()))?;

        tracing::info!(%user_id, amount, balance, "credits added");
        let _ = self.event_bus.publish(LedgerEvent::CreditsAdded {
            user_id,
            amount,
            balance,
            reason: CreditReason::TopUp,
            timestamp: Utc::now(),
        });
        Ok(balance)
    }

    /// Removes `amount` credits if, and only if, the balance covers it.
    ///
    /// `Ok(false)` means the balance was too low (or the user unknown) and
    /// nothing changed; a store failure is an `Err`, never `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidAmount`] for a non-positive amount and
    /// [`GatewayError::PersistenceError`] on store failure.
    pub async fn deduct_credits(&self, user_id: UserId, amount: i64) -> Result<bool, GatewayError> {
        ensure_positive(amount)?;
        let deducted = self.store.deduct_credits(user_id, amount).await?;
        if deducted {
            tracing::debug!(%user_id, amount, "credits deducted");
            let _ = self.event_bus.publish(LedgerEvent::CreditsDeducted {
                user_id,
                amount,
                timestamp: Utc::now(),
            });
        } else {
            tracing::debug!(%user_id, amount, "deduction refused: insufficient balance");
        }
        Ok(deducted)
    }

    /// Compensating credit for a charged request that failed. Applying the
    /// same `request_id` twice is a no-op; returns whether this call
    /// applied it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidAmount`] for a non-positive or overflowing amount,
    /// [`GatewayError::UserNotFound`] for an unknown user and
    /// [`GatewayError::PersistenceError`] on store failure.
    pub async fn refund_credits(
        &self,
        user_id: UserId,
        amount: i64,
        request_id: Uuid,
    ) -> Result<bool, GatewayError> {
        ensure_positive(amount)?;
        let Some(balance) = self.store.refund_credits(user_id, amount, request_id).await? else {
            tracing::warn!(%user_id, %request_id, "refund already applied");
            return Ok(false);
        };

        tracing::info!(%user_id, %request_id, amount, balance, "credits refunded");
        let _ = self.event_bus.publish(LedgerEvent::CreditsRefunded {
            user_id,
            amount,
            request_id,
            timestamp: Utc::now(),
        });
        Ok(true)
    }

    // ---- Generation recorder ----

    /// Appends a generation and bumps the account's counter. `None` if the
    /// account cannot be resolved.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    pub async fn record_generation(
        &self,
        generation: NewGeneration,
    ) -> Result<Option<Generation>, GatewayError> {
        let user_id = generation.user_id;
        let Some(record) = self.store.insert_generation(generation).await? else {
            tracing::warn!(%user_id, "generation not recorded: unknown user");
            return Ok(None);
        };

        let _ = self.event_bus.publish(LedgerEvent::GenerationRecorded {
            user_id,
            generation_id: record.id,
            image_url: record.image_url.clone(),
            cost: record.cost,
            timestamp: record.created_at,
        });
        Ok(Some(record))
    }

    /// Most recent generations first; `limit` is clamped to
    /// `1..=MAX_HISTORY_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    pub async fn list_recent_generations(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Generation>, GatewayError> {
        self.store
            .recent_generations(user_id, limit.clamp(1, MAX_HISTORY_LIMIT))
            .await
    }

    /// Balance and generation count; `None` for an unknown user.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    pub async fn get_stats(&self, user_id: UserId) -> Result<Option<UserStats>, GatewayError> {
        self.store.stats(user_id).await
    }

    // ---- Purchase recorder ----

    /// Records a pending purchase.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DuplicatePayment`] if the payment id was
    /// already recorded, [`GatewayError::UserNotFound`] for an unknown user,
    /// [`GatewayError::InvalidAmount`] for non-positive credits or a
    /// negative price and [`GatewayError::PersistenceError`] on store
    /// failure.
    pub async fn record_purchase(&self, purchase: NewPurchase) -> Result<Purchase, GatewayError> {
        ensure_positive(purchase.credits)?;
        if purchase.price_minor < 0 {
            return Err(GatewayError::InvalidAmount(purchase.price_minor));
        }
        if purchase.payment_id.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "payment_id must not be empty".to_string(),
            ));
        }

        let user_id = purchase.user_id;
        let record = self
            .store
            .insert_purchase(purchase)
            .await?
            .ok_or(GatewayError::UserNotFound(user_id.as_i64()))?;

        tracing::info!(
            %user_id,
            payment_id = %record.payment_id,
            package_id = %record.package_id,
            "purchase recorded"
        );
        let _ = self.event_bus.publish(LedgerEvent::PurchaseRecorded {
            user_id,
            payment_id: record.payment_id.clone(),
            package_id: record.package_id.clone(),
            status: record.status,
            timestamp: record.created_at,
        });
        Ok(record)
    }

    /// Records a pending purchase of a catalog package. Without an explicit
    /// `payment_id`, one is derived from the user id and the current time.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PackageNotFound`] for an unknown package and
    /// any error of [`Self::record_purchase`].
    pub async fn create_purchase_intent(
        &self,
        user_id: UserId,
        package_id: &str,
        payment_id: Option<String>,
    ) -> Result<Purchase, GatewayError> {
        let package =
            find_package(package_id).ok_or(GatewayError::PackageNotFound(package_id.to_string()))?;
        let payment_id = payment_id.unwrap_or_else(|| default_payment_id(user_id, Utc::now()));

        self.record_purchase(NewPurchase {
            user_id,
            package_id: package.id.to_string(),
            price_minor: package.price_minor,
            credits: package.credits,
            payment_id,
        })
        .await
    }

    /// Most recent purchases first; `limit` is clamped to
    /// `1..=MAX_HISTORY_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    pub async fn list_purchases(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Purchase>, GatewayError> {
        self.store
            .recent_purchases(user_id, limit.clamp(1, MAX_HISTORY_LIMIT))
            .await
    }

    /// Checks that the store answers.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if it does not.
    pub async fn health(&self) -> Result<(), GatewayError> {
        self.store.ping().await
    }
}

fn ensure_positive(amount: i64) -> Result<(), GatewayError> {
    if amount <= 0 {
        return Err(GatewayError::InvalidAmount(amount));
    }
    Ok(())
}
