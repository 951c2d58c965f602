//! In-process ledger store.
//!
//! All state lives behind one [`tokio::sync::RwLock`]; every mutating
//! operation holds the write lock for its whole duration, which gives the
//! same atomicity the PostgreSQL store gets from conditional updates and
//! transactions.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LedgerStore, UpsertedAccount};
use crate::domain::{
    Account, Generation, NewGeneration, NewPurchase, Purchase, UserId, UserProfile, UserStats,
};
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<UserId, Account>,
    generations: Vec<Generation>,
    purchases: Vec<Purchase>,
    payment_ids: HashSet<String>,
    generation_requests: HashSet<Uuid>,
    refund_keys: HashSet<Uuid>,
    next_generation_id: i64,
    next_purchase_id: i64,
}

/// Ledger store kept in memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: RwLock<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with a persistence error, as
    /// if the database had gone away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::persistence("store unavailable"));
        }
        Ok(())
    }
}

/// Balance after crediting `amount`; an overflowing credit is rejected.
fn credited(balance: i64, amount: i64) -> Result<i64, GatewayError> {
    balance
        .checked_add(amount)
        .ok_or(GatewayError::InvalidAmount(amount))
}

fn newest_first<T: Clone>(
    items: &[T],
    matches: impl Fn(&T) -> bool,
    limit: i64,
) -> Vec<T> {
    let limit = usize::try_from(limit).unwrap_or(0);
    items
        .iter()
        .rev()
        .filter(|&item| matches(item))
        .take(limit)
        .cloned()
        .collect()
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn upsert_account(
        &self,
        user_id: UserId,
        profile: &UserProfile,
    ) -> Result<UpsertedAccount, GatewayError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if let Some(account) = state.accounts.get_mut(&user_id) {
            account.profile = profile.clone();
            account.last_active = Utc::now();
            return Ok(UpsertedAccount {
                account: account.clone(),
                created: false,
            });
        }
        let account = Account::new(user_id, profile.clone());
        state.accounts.insert(user_id, account.clone());
        Ok(UpsertedAccount {
            account,
            created: true,
        })
    }

    async fn find_account(&self, user_id: UserId) -> Result<Option<Account>, GatewayError> {
        self.check_available()?;
        Ok(self.state.read().await.accounts.get(&user_id).cloned())
    }

    async fn claim_signup_bonus(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> Result<Option<i64>, GatewayError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let Some(account) = state.accounts.get_mut(&user_id) else {
            return Ok(None);
        };
        if account.signup_bonus_granted {
            return Ok(None);
        }
        account.balance = credited(account.balance, amount)?;
        account.signup_bonus_granted = true;
        account.last_active = Utc::now();
        Ok(Some(account.balance))
    }

    async fn add_credits(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> Result<Option<i64>, GatewayError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let Some(account) = state.accounts.get_mut(&user_id) else {
            return Ok(None);
        };
        account.balance = credited(account.balance, amount)?;
        account.last_active = Utc::now();
        Ok(Some(account.balance))
    }

    async fn deduct_credits(&self, user_id: UserId, amount: i64) -> Result<bool, GatewayError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        match state.accounts.get_mut(&user_id) {
            Some(account) if account.balance >= amount => {
                account.balance -= amount;
                account.last_active = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn refund_credits(
        &self,
        user_id: UserId,
        amount: i64,
        request_id: Uuid,
    ) -> Result<Option<i64>, GatewayError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if state.refund_keys.contains(&request_id) {
            return Ok(None);
        }
        let Some(account) = state.accounts.get_mut(&user_id) else {
            return Err(GatewayError::UserNotFound(user_id.as_i64()));
        };
        account.balance = credited(account.balance, amount)?;
        account.last_active = Utc::now();
        let balance = account.balance;
        state.refund_keys.insert(request_id);
        Ok(Some(balance))
    }

    async fn insert_generation(
        &self,
        generation: NewGeneration,
    ) -> Result<Option<Generation>, GatewayError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(&generation.user_id) {
            return Ok(None);
        }
        if let Some(request_id) = generation.request_id
            && !state.generation_requests.insert(request_id)
        {
            return Err(GatewayError::InvalidRequest(format!(
                "generation already recorded for request {request_id}"
            )));
        }

        state.next_generation_id += 1;
        let id = state.next_generation_id;
        let user_id = generation.user_id;
        let record = generation.into_generation(id, Utc::now());
        state.generations.push(record.clone());
        if let Some(account) = state.accounts.get_mut(&user_id) {
            account.total_generations += 1;
            account.last_active = Utc::now();
        }
        Ok(Some(record))
    }

    async fn recent_generations(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Generation>, GatewayError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(newest_first(&state.generations, |g| g.user_id == user_id, limit))
    }

    async fn stats(&self, user_id: UserId) -> Result<Option<UserStats>, GatewayError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.accounts.get(&user_id).map(|account| {
            let count = state
                .generations
                .iter()
                .filter(|g| g.user_id == user_id)
                .count();
            UserStats {
                balance: account.balance,
                generation_count: i64::try_from(count).unwrap_or(i64::MAX),
            }
        }))
    }

    async fn insert_purchase(
        &self,
        purchase: NewPurchase,
    ) -> Result<Option<Purchase>, GatewayError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(&purchase.user_id) {
            return Ok(None);
        }
        if state.payment_ids.contains(&purchase.payment_id) {
            return Err(GatewayError::DuplicatePayment(purchase.payment_id));
        }

        state.payment_ids.insert(purchase.payment_id.clone());
        state.next_purchase_id += 1;
        let record = purchase.into_pending(state.next_purchase_id, Utc::now());
        state.purchases.push(record.clone());
        Ok(Some(record))
    }

    async fn recent_purchases(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Purchase>, GatewayError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(newest_first(&state.purchases, |p| p.user_id == user_id, limit))
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        self.check_available()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::PurchaseStatus;

    async fn store_with_balance(user: i64, balance: i64) -> MemoryLedgerStore {
        let store = MemoryLedgerStore::new();
        let user_id = UserId::new(user);
        let _ = store.upsert_account(user_id, &UserProfile::default()).await;
        if balance > 0 {
            let _ = store.add_credits(user_id, balance).await;
        }
        store
    }

    fn purchase(user: i64, payment_id: &str) -> NewPurchase {
        NewPurchase {
            user_id: UserId::new(user),
            package_id: "10".to_string(),
            price_minor: 9_900,
            credits: 10,
            payment_id: payment_id.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_keeps_balance_and_updates_profile() {
        let store = store_with_balance(1, 5).await;
        let profile = UserProfile {
            username: Some("new_handle".to_string()),
            ..UserProfile::default()
        };
        let Ok(upserted) = store.upsert_account(UserId::new(1), &profile).await else {
            panic!("upsert failed");
        };
        assert!(!upserted.created);
        assert_eq!(upserted.account.balance, 5);
        assert_eq!(upserted.account.profile, profile);
    }

    #[tokio::test]
    async fn deduct_is_conditional() {
        let store = store_with_balance(1, 2).await;
        let user = UserId::new(1);

        assert!(matches!(store.deduct_credits(user, 3).await, Ok(false)));
        assert!(matches!(store.deduct_credits(user, 2).await, Ok(true)));
        assert!(matches!(store.deduct_credits(user, 1).await, Ok(false)));

        let balance = store.find_account(user).await.ok().flatten().map(|a| a.balance);
        assert_eq!(balance, Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_deductions_never_overdraw() {
        let store = Arc::new(store_with_balance(1, 3).await);
        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.deduct_credits(UserId::new(1), 1).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if let Ok(Ok(true)) = handle.await {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 3);

        let balance = store
            .find_account(UserId::new(1))
            .await
            .ok()
            .flatten()
            .map(|a| a.balance);
        assert_eq!(balance, Some(0));
    }

    #[tokio::test]
    async fn refund_key_is_applied_once() {
        let store = store_with_balance(1, 0).await;
        let request_id = Uuid::new_v4();

        let first = store.refund_credits(UserId::new(1), 1, request_id).await;
        let second = store.refund_credits(UserId::new(1), 1, request_id).await;
        assert!(matches!(first, Ok(Some(1))));
        assert!(matches!(second, Ok(None)));
    }

    #[tokio::test]
    async fn overflowing_credit_leaves_account_untouched() {
        let store = store_with_balance(1, 5).await;
        let user = UserId::new(1);
        let request_id = Uuid::new_v4();

        let refund = store.refund_credits(user, i64::MAX, request_id).await;
        assert!(matches!(refund, Err(GatewayError::InvalidAmount(i64::MAX))));
        let bonus = store.claim_signup_bonus(user, i64::MAX).await;
        assert!(matches!(bonus, Err(GatewayError::InvalidAmount(i64::MAX))));

        let Ok(Some(account)) = store.find_account(user).await else {
            panic!("account should exist");
        };
        assert_eq!(account.balance, 5);
        assert!(!account.signup_bonus_granted);

        // The rejected refund did not consume its key.
        assert!(matches!(
            store.refund_credits(user, 1, request_id).await,
            Ok(Some(6))
        ));
    }

    #[tokio::test]
    async fn duplicate_payment_id_is_rejected() {
        let store = store_with_balance(1, 0).await;

        let first = store.insert_purchase(purchase(1, "1_100")).await;
        let Ok(Some(first)) = first else {
            panic!("first purchase should be recorded");
        };
        assert_eq!(first.status, PurchaseStatus::Pending);

        let second = store.insert_purchase(purchase(1, "1_100")).await;
        assert!(matches!(second, Err(GatewayError::DuplicatePayment(_))));

        let all = store.recent_purchases(UserId::new(1), 10).await.unwrap_or_default();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn unknown_user_writes_are_noops() {
        let store = MemoryLedgerStore::new();
        let generation = NewGeneration {
            user_id: UserId::new(404),
            request_id: None,
            prompt: "prompt".to_string(),
            negative_prompt: None,
            image_url: "https://x".to_string(),
            asset_id: None,
            cost: 1,
        };
        assert!(matches!(store.insert_generation(generation).await, Ok(None)));
        assert!(matches!(store.insert_purchase(purchase(404, "p")).await, Ok(None)));
        assert!(matches!(store.add_credits(UserId::new(404), 5).await, Ok(None)));
        assert!(matches!(store.stats(UserId::new(404)).await, Ok(None)));
    }

    #[tokio::test]
    async fn unavailable_store_reports_persistence_errors() {
        let store = store_with_balance(1, 5).await;
        store.set_unavailable(true);
        assert!(matches!(
            store.deduct_credits(UserId::new(1), 1).await,
            Err(GatewayError::PersistenceError(_))
        ));
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
