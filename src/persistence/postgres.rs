//! PostgreSQL implementation of the persistence layer.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{LedgerRow, PriceRow, RewardRow, UserRow, stored_symbol};
use super::{AppendOutcome, Holdings, PriceSource, RewardStore};
use crate::config::LedgerConfig;
use crate::domain::{
    DayWindow, EventId, LedgerBatch, LedgerEntry, LedgerTotals, RewardEvent, StockPriceSnapshot,
    Symbol, User, UserId,
};
use crate::error::LedgerError;

const REWARD_COLUMNS: &str =
    "id, event_id, user_id, stock_symbol, quantity, event_time, created_at";

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
///
/// Rewards and their ledger lines are written in one transaction. If the
/// returned future is dropped before commit, the transaction is dropped
/// with it and rolled back.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if the database is unreachable.
    pub async fn connect(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(LedgerError::persistence)?;
        Ok(Self::new(pool))
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(LedgerError::persistence)
    }

    async fn sum_quantity(
        &self,
        user_id: UserId,
        from: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
        until_inclusive: bool,
    ) -> Result<Holdings, LedgerError> {
        let upper = if until_inclusive { "<=" } else { "<" };
        let sql = format!(
            "SELECT stock_symbol, SUM(quantity) FROM reward_events \
             WHERE user_id = $1 AND ($2::timestamptz IS NULL OR event_time >= $2) \
             AND event_time {upper} $3 GROUP BY stock_symbol"
        );
        let rows = sqlx::query_as::<_, (String, Decimal)>(&sql)
            .bind(*user_id.as_uuid())
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await
            .map_err(LedgerError::persistence)?;

        rows.into_iter()
            .map(|(symbol, quantity)| stored_symbol(&symbol).map(|s| (s, quantity)))
            .collect()
    }
}

#[async_trait]
impl RewardStore for PostgresStore {
    async fn find_reward_by_event_id(
        &self,
        event_id: EventId,
    ) -> Result<Option<RewardEvent>, LedgerError> {
        let sql = format!("SELECT {REWARD_COLUMNS} FROM reward_events WHERE event_id = $1");
        sqlx::query_as::<_, RewardRow>(&sql)
            .bind(*event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(LedgerError::persistence)?
            .map(RewardEvent::try_from)
            .transpose()
    }

    async fn create_user_if_absent(&self, user_id: UserId) -> Result<User, LedgerError> {
        let created = sqlx::query(
            "INSERT INTO users (id, created_at) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(*user_id.as_uuid())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(LedgerError::persistence)?
        .rows_affected();

        if created > 0 {
            tracing::info!(%user_id, "created new user");
        }

        let row = sqlx::query_as::<_, UserRow>("SELECT id, created_at FROM users WHERE id = $1")
            .bind(*user_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(LedgerError::persistence)?;
        Ok(row.into())
    }

    async fn append_reward_and_ledger(
        &self,
        reward: &RewardEvent,
        batch: &LedgerBatch,
    ) -> Result<AppendOutcome, LedgerError> {
        if batch.event_id() != reward.event_id {
            return Err(LedgerError::Internal(format!(
                "ledger batch for {} attached to reward {}",
                batch.event_id(),
                reward.event_id
            )));
        }

        let mut tx = self.pool.begin().await.map_err(LedgerError::persistence)?;

        // A concurrent writer holding the same event_id makes this wait for
        // its commit, then affect zero rows.
        let inserted = sqlx::query(
            "INSERT INTO reward_events \
             (id, event_id, user_id, stock_symbol, quantity, event_time, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(reward.id)
        .bind(*reward.event_id.as_uuid())
        .bind(*reward.user_id.as_uuid())
        .bind(reward.symbol.as_str())
        .bind(reward.quantity)
        .bind(reward.timestamp)
        .bind(reward.created_at)
        .execute(&mut *tx)
        .await
        .map_err(LedgerError::persistence)?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await.map_err(LedgerError::persistence)?;
            return Ok(AppendOutcome::DuplicateEvent);
        }

        for entry in batch.entries() {
            sqlx::query(
                "INSERT INTO ledger_entries \
                 (id, event_id, entry_type, symbol, debit, credit, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(entry.id)
            .bind(*entry.event_id.as_uuid())
            .bind(entry.account.kind().as_str())
            .bind(entry.account.symbol().map(Symbol::as_str))
            .bind(entry.debit)
            .bind(entry.credit)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await
            .map_err(LedgerError::persistence)?;
        }

        let (debit, credit) = sqlx::query_as::<_, (Decimal, Decimal)>(
            "SELECT COALESCE(SUM(debit), 0), COALESCE(SUM(credit), 0) \
             FROM ledger_entries WHERE event_id = $1",
        )
        .bind(*reward.event_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(LedgerError::persistence)?;

        // Dropping `tx` on the error path rolls back.
        LedgerTotals { debit, credit }.ensure_balanced()?;

        tx.commit().await.map_err(LedgerError::persistence)?;
        Ok(AppendOutcome::Committed)
    }

    async fn sum_quantity_as_of(
        &self,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Holdings, LedgerError> {
        self.sum_quantity(user_id, None, as_of, true).await
    }

    async fn sum_quantity_in_window(
        &self,
        user_id: UserId,
        window: &DayWindow,
    ) -> Result<Holdings, LedgerError> {
        self.sum_quantity(user_id, Some(window.start), window.end, false)
            .await
    }

    async fn rewards_in_window(
        &self,
        user_id: UserId,
        window: &DayWindow,
    ) -> Result<Vec<RewardEvent>, LedgerError> {
        let sql = format!(
            "SELECT {REWARD_COLUMNS} FROM reward_events \
             WHERE user_id = $1 AND event_time >= $2 AND event_time < $3 \
             ORDER BY event_time DESC"
        );
        sqlx::query_as::<_, RewardRow>(&sql)
            .bind(*user_id.as_uuid())
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool)
            .await
            .map_err(LedgerError::persistence)?
            .into_iter()
            .map(RewardEvent::try_from)
            .collect()
    }

    async fn ledger_entries_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        sqlx::query_as::<_, LedgerRow>(
            "SELECT id, event_id, entry_type, symbol, debit, credit, created_at \
             FROM ledger_entries WHERE event_id = $1 \
             ORDER BY CASE entry_type WHEN 'STOCK' THEN 0 WHEN 'CASH' THEN 1 ELSE 2 END",
        )
        .bind(*event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(LedgerError::persistence)?
        .into_iter()
        .map(LedgerEntry::try_from)
        .collect()
    }

    async fn ledger_totals(&self) -> Result<LedgerTotals, LedgerError> {
        let (debit, credit) = sqlx::query_as::<_, (Decimal, Decimal)>(
            "SELECT COALESCE(SUM(debit), 0), COALESCE(SUM(credit), 0) FROM ledger_entries",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(LedgerError::persistence)?;
        Ok(LedgerTotals { debit, credit })
    }
}

#[async_trait]
impl PriceSource for PostgresStore {
    async fn latest_price(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<StockPriceSnapshot>, LedgerError> {
        sqlx::query_as::<_, PriceRow>(
            "SELECT symbol, price, observed_at FROM stock_prices \
             WHERE symbol = $1 ORDER BY observed_at DESC LIMIT 1",
        )
        .bind(symbol.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(LedgerError::persistence)?
        .map(StockPriceSnapshot::try_from)
        .transpose()
    }

    async fn price_as_of(
        &self,
        symbol: &Symbol,
        instant: DateTime<Utc>,
    ) -> Result<Option<StockPriceSnapshot>, LedgerError> {
        sqlx::query_as::<_, PriceRow>(
            "SELECT symbol, price, observed_at FROM stock_prices \
             WHERE symbol = $1 AND observed_at <= $2 ORDER BY observed_at DESC LIMIT 1",
        )
        .bind(symbol.as_str())
        .bind(instant)
        .fetch_optional(&self.pool)
        .await
        .map_err(LedgerError::persistence)?
        .map(StockPriceSnapshot::try_from)
        .transpose()
    }

    async fn all_latest_prices(&self) -> Result<BTreeMap<Symbol, Decimal>, LedgerError> {
        let rows = sqlx::query_as::<_, (String, Decimal)>(
            "SELECT DISTINCT ON (symbol) symbol, price FROM stock_prices \
             ORDER BY symbol, observed_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(LedgerError::persistence)?;

        rows.into_iter()
            .map(|(symbol, price)| stored_symbol(&symbol).map(|s| (s, price)))
            .collect()
    }

    async fn upsert_price(&self, snapshot: &StockPriceSnapshot) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO stock_prices (symbol, price, observed_at) VALUES ($1, $2, $3) \
             ON CONFLICT (symbol, observed_at) DO UPDATE SET price = EXCLUDED.price",
        )
        .bind(snapshot.symbol.as_str())
        .bind(snapshot.price)
        .bind(snapshot.observed_at)
        .execute(&self.pool)
        .await
        .map_err(LedgerError::persistence)?;
        Ok(())
    }
}
