//! Database row models and their conversion into domain records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    EventId, LedgerAccount, LedgerEntry, RewardEvent, StockPriceSnapshot, Symbol, User, UserId,
};
use crate::error::LedgerError;

/// A row of the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// User identity.
    pub id: Uuid,
    /// First-seen timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            created_at: row.created_at,
        }
    }
}

/// A row of the `reward_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RewardRow {
    /// Row identity.
    pub id: Uuid,
    /// Idempotency key (unique).
    pub event_id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Stock symbol.
    pub stock_symbol: String,
    /// Rewarded quantity (`NUMERIC`).
    pub quantity: Decimal,
    /// Upstream event time.
    pub event_time: DateTime<Utc>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<RewardRow> for RewardEvent {
    type Error = LedgerError;

    fn try_from(row: RewardRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            event_id: EventId::from_uuid(row.event_id),
            user_id: UserId::from_uuid(row.user_id),
            symbol: stored_symbol(&row.stock_symbol)?,
            quantity: row.quantity,
            timestamp: row.event_time,
            created_at: row.created_at,
        })
    }
}

/// A row of the `ledger_entries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerRow {
    /// Row identity.
    pub id: Uuid,
    /// Owning reward event.
    pub event_id: Uuid,
    /// `STOCK`, `CASH` or `FEE`.
    pub entry_type: String,
    /// Present only for `STOCK` lines.
    pub symbol: Option<String>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = LedgerError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            event_id: EventId::from_uuid(row.event_id),
            account: LedgerAccount::from_parts(&row.entry_type, row.symbol.as_deref())?,
            debit: row.debit,
            credit: row.credit,
            created_at: row.created_at,
        })
    }
}

/// A row of the `stock_prices` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceRow {
    /// Stock symbol.
    pub symbol: String,
    /// Price per share.
    pub price: Decimal,
    /// Observation time.
    pub observed_at: DateTime<Utc>,
}

impl TryFrom<PriceRow> for StockPriceSnapshot {
    type Error = LedgerError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        Ok(Self::new(stored_symbol(&row.symbol)?, row.price, row.observed_at))
    }
}

/// Parses a symbol read back from storage. A failure means the row was
/// written outside this service.
pub(crate) fn stored_symbol(raw: &str) -> Result<Symbol, LedgerError> {
    Symbol::parse(raw).map_err(|e| LedgerError::Internal(format!("stored symbol {raw:?}: {e}")))
}
