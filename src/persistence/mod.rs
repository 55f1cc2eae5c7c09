//! Persistence layer: reward/ledger storage and price snapshots.
//!
//! Provides the [`RewardStore`] and [`PriceSource`] traits consumed by the
//! service layer. [`postgres::PostgresStore`] is the durable implementation
//! over `sqlx::PgPool`; [`memory::InMemoryStore`] offers the same contract
//! in process memory.

pub mod memory;
pub mod models;
pub mod postgres;

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    DayWindow, EventId, LedgerBatch, LedgerEntry, LedgerTotals, RewardEvent, StockPriceSnapshot,
    Symbol, User, UserId,
};
use crate::error::LedgerError;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Summed reward quantity per symbol.
pub type Holdings = BTreeMap<Symbol, Decimal>;

/// Result of appending a reward with its ledger lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Reward and all ledger lines were committed together.
    Committed,
    /// A reward with the same `event_id` already exists; nothing was written.
    DuplicateEvent,
}

/// Append-only storage of rewards, users and ledger lines.
///
/// `Err` is reserved for I/O failures; "not found" is `Ok(None)` or an
/// empty collection.
#[async_trait]
pub trait RewardStore: Send + Sync + Debug {
    /// Looks up a reward by its idempotency key.
    async fn find_reward_by_event_id(
        &self,
        event_id: EventId,
    ) -> Result<Option<RewardEvent>, LedgerError>;

    /// Returns the user, creating it if absent. A concurrent creation of the
    /// same user is success.
    async fn create_user_if_absent(&self, user_id: UserId) -> Result<User, LedgerError>;

    /// Atomically persists `reward` and `batch`. Either everything commits
    /// or nothing does. A reward whose `event_id` already exists yields
    /// [`AppendOutcome::DuplicateEvent`].
    async fn append_reward_and_ledger(
        &self,
        reward: &RewardEvent,
        batch: &LedgerBatch,
    ) -> Result<AppendOutcome, LedgerError>;

    /// Summed quantity per symbol over rewards with `timestamp <= as_of`.
    async fn sum_quantity_as_of(
        &self,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Holdings, LedgerError>;

    /// Summed quantity per symbol over rewards inside `window`.
    async fn sum_quantity_in_window(
        &self,
        user_id: UserId,
        window: &DayWindow,
    ) -> Result<Holdings, LedgerError>;

    /// Rewards inside `window`, most recent first.
    async fn rewards_in_window(
        &self,
        user_id: UserId,
        window: &DayWindow,
    ) -> Result<Vec<RewardEvent>, LedgerError>;

    /// Ledger lines of one event, in stock, cash, fee order.
    async fn ledger_entries_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Debit and credit sums over the whole ledger.
    async fn ledger_totals(&self) -> Result<LedgerTotals, LedgerError>;
}

/// Read/write access to per-symbol price history.
#[async_trait]
pub trait PriceSource: Send + Sync + Debug {
    /// Snapshot with the greatest observation time for `symbol`.
    async fn latest_price(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<StockPriceSnapshot>, LedgerError>;

    /// Snapshot with the greatest observation time `<= instant`.
    async fn price_as_of(
        &self,
        symbol: &Symbol,
        instant: DateTime<Utc>,
    ) -> Result<Option<StockPriceSnapshot>, LedgerError>;

    /// Latest price of every known symbol.
    async fn all_latest_prices(&self) -> Result<BTreeMap<Symbol, Decimal>, LedgerError>;

    /// Inserts a snapshot, replacing the price of an existing
    /// `(symbol, observed_at)` pair.
    async fn upsert_price(&self, snapshot: &StockPriceSnapshot) -> Result<(), LedgerError>;
}
