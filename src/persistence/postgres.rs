//! PostgreSQL implementation of the ledger store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::models::{
    ACCOUNT_COLUMNS, AccountRow, GENERATION_COLUMNS, GenerationRow, PURCHASE_COLUMNS, PurchaseRow,
};
use super::{LedgerStore, UpsertedAccount};
use crate::config::DatabaseConfig;
use crate::domain::{
    Account, Generation, NewGeneration, NewPurchase, Purchase, UserId, UserProfile, UserStats,
};
use crate::error::GatewayError;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for `numeric_value_out_of_range`, raised when `balance` overflows `BIGINT`.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// PostgreSQL-backed ledger store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    account: AccountRow,
    inserted: bool,
}

fn has_sqlstate(err: &sqlx::Error, code: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(code),
        _ => false,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_sqlstate(err, UNIQUE_VIOLATION)
}

/// Maps a failed balance credit: an overflowing `amount` is the caller's error.
fn credit_error(err: sqlx::Error, amount: i64) -> GatewayError {
    if has_sqlstate(&err, NUMERIC_VALUE_OUT_OF_RANGE) {
        GatewayError::InvalidAmount(amount)
    } else {
        GatewayError::persistence(err)
    }
}

impl PostgresLedgerStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the process-wide connection pool.
    ///
    /// Once every connection is checked out, further queries wait at most
    /// `acquire_timeout_secs` and then fail with a retryable
    /// [`GatewayError::PersistenceError`].
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the database cannot be
    /// reached.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(GatewayError::persistence)?;
        tracing::info!(
            max_connections = config.max_connections,
            "database pool established"
        );
        Ok(Self::new(pool))
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(GatewayError::persistence)?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn upsert_account(
        &self,
        user_id: UserId,
        profile: &UserProfile,
    ) -> Result<UpsertedAccount, GatewayError> {
        let query = format!(
            "INSERT INTO users (user_id, username, first_name, last_name) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 username = EXCLUDED.username, \
                 first_name = EXCLUDED.first_name, \
                 last_name = EXCLUDED.last_name, \
                 last_active = NOW() \
             RETURNING {ACCOUNT_COLUMNS}, (xmax = 0) AS inserted"
        );
        let row = sqlx::query_as::<_, UpsertRow>(&query)
            .bind(user_id.as_i64())
            .bind(profile.username.as_deref())
            .bind(profile.first_name.as_deref())
            .bind(profile.last_name.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(GatewayError::persistence)?;

        Ok(UpsertedAccount {
            account: Account::from(row.account),
            created: row.inserted,
        })
    }

    async fn find_account(&self, user_id: UserId) -> Result<Option<Account>, GatewayError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE user_id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(user_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::persistence)?;
        Ok(row.map(Account::from))
    }

    async fn claim_signup_bonus(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> Result<Option<i64>, GatewayError> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE users \
             SET balance = balance + $2, signup_bonus_granted = TRUE, last_active = NOW() \
             WHERE user_id = $1 AND signup_bonus_granted = FALSE \
             RETURNING balance",
        )
        .bind(user_id.as_i64())
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| credit_error(e, amount))
    }

    async fn add_credits(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> Result<Option<i64>, GatewayError> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE users SET balance = balance + $2, last_active = NOW() \
             WHERE user_id = $1 RETURNING balance",
        )
        .bind(user_id.as_i64())
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| credit_error(e, amount))
    }

    async fn deduct_credits(&self, user_id: UserId, amount: i64) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE users SET balance = balance - $2, last_active = NOW() \
             WHERE user_id = $1 AND balance >= $2",
        )
        .bind(user_id.as_i64())
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::persistence)?;

        Ok(result.rows_affected() == 1)
    }

    async fn refund_credits(
        &self,
        user_id: UserId,
        amount: i64,
        request_id: Uuid,
    ) -> Result<Option<i64>, GatewayError> {
        let mut tx = self.pool.begin().await.map_err(GatewayError::persistence)?;

        let claimed = sqlx::query(
            "INSERT INTO credit_refunds (request_id, user_id, amount) VALUES ($1, $2, $3) \
             ON CONFLICT (request_id) DO NOTHING",
        )
        .bind(request_id)
        .bind(user_id.as_i64())
        .bind(amount)
        .execute(&mut *tx)
        .await
        .map_err(GatewayError::persistence)?;

        if claimed.rows_affected() == 0 {
            return Ok(None);
        }

        let balance = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET balance = balance + $2, last_active = NOW() \
             WHERE user_id = $1 RETURNING balance",
        )
        .bind(user_id.as_i64())
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| credit_error(e, amount))?;

        let Some(balance) = balance else {
            // Dropping the transaction rolls back the claimed key.
            return Err(GatewayError::UserNotFound(user_id.as_i64()));
        };

        tx.commit().await.map_err(GatewayError::persistence)?;
        Ok(Some(balance))
    }

    async fn insert_generation(
        &self,
        generation: NewGeneration,
    ) -> Result<Option<Generation>, GatewayError> {
        let mut tx = self.pool.begin().await.map_err(GatewayError::persistence)?;

        let user_ref = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM users WHERE user_id = $1 FOR UPDATE",
        )
        .bind(generation.user_id.as_i64())
        .fetch_optional(&mut *tx)
        .await
        .map_err(GatewayError::persistence)?;

        let Some(user_ref) = user_ref else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO generations \
             (user_ref, user_id, request_id, prompt, negative_prompt, image_url, asset_id, cost) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {GENERATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, GenerationRow>(&query)
            .bind(user_ref)
            .bind(generation.user_id.as_i64())
            .bind(generation.request_id)
            .bind(&generation.prompt)
            .bind(generation.negative_prompt.as_deref())
            .bind(&generation.image_url)
            .bind(generation.asset_id.as_deref())
            .bind(generation.cost)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    GatewayError::InvalidRequest(format!(
                        "generation already recorded for request {}",
                        generation.request_id.map(|id| id.to_string()).unwrap_or_default()
                    ))
                } else {
                    GatewayError::persistence(e)
                }
            })?;

        sqlx::query(
            "UPDATE users SET total_generations = total_generations + 1, last_active = NOW() \
             WHERE id = $1",
        )
        .bind(user_ref)
        .execute(&mut *tx)
        .await
        .map_err(GatewayError::persistence)?;

        tx.commit().await.map_err(GatewayError::persistence)?;
        Ok(Some(Generation::from(row)))
    }

    async fn recent_generations(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Generation>, GatewayError> {
        let query = format!(
            "SELECT {GENERATION_COLUMNS} FROM generations WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, GenerationRow>(&query)
            .bind(user_id.as_i64())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::persistence)?;
        Ok(rows.into_iter().map(Generation::from).collect())
    }

    async fn stats(&self, user_id: UserId) -> Result<Option<UserStats>, GatewayError> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            "SELECT u.balance, \
                    (SELECT COUNT(*) FROM generations g WHERE g.user_id = u.user_id) \
             FROM users u WHERE u.user_id = $1",
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(GatewayError::persistence)?;

        Ok(row.map(|(balance, generation_count)| UserStats {
            balance,
            generation_count,
        }))
    }

    async fn insert_purchase(
        &self,
        purchase: NewPurchase,
    ) -> Result<Option<Purchase>, GatewayError> {
        let user_ref = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE user_id = $1")
            .bind(purchase.user_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::persistence)?;

        let Some(user_ref) = user_ref else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO purchases \
             (user_ref, user_id, package_id, price_minor, credits, payment_id, status) \
             VALUES ($1, $2, $3, $4, $5, $6, 'pending') \
             RETURNING {PURCHASE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PurchaseRow>(&query)
            .bind(user_ref)
            .bind(purchase.user_id.as_i64())
            .bind(&purchase.package_id)
            .bind(purchase.price_minor)
            .bind(purchase.credits)
            .bind(&purchase.payment_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    GatewayError::DuplicatePayment(purchase.payment_id.clone())
                } else {
                    GatewayError::persistence(e)
                }
            })?;

        Purchase::try_from(row).map(Some)
    }

    async fn recent_purchases(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Purchase>, GatewayError> {
        let query = format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, PurchaseRow>(&query)
            .bind(user_id.as_i64())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::persistence)?;
        rows.into_iter().map(Purchase::try_from).collect()
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(GatewayError::persistence)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database pool closed");
    }
}
