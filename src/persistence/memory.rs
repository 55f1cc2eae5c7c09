//! In-process implementation of the persistence traits.
//!
//! [`InMemoryStore`] keeps every table behind a single
//! [`tokio::sync::RwLock`]. An append holds the write lock for the whole
//! reward + ledger insert, which gives the same all-or-nothing and
//! unique-`event_id` guarantees as the database transaction.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{AppendOutcome, Holdings, PriceSource, RewardStore};
use crate::domain::{
    DayWindow, EventId, LedgerBatch, LedgerEntry, LedgerTotals, RewardEvent, StockPriceSnapshot,
    Symbol, User, UserId,
};
use crate::error::LedgerError;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    rewards: HashMap<EventId, RewardEvent>,
    ledger: Vec<LedgerEntry>,
    prices: BTreeMap<Symbol, BTreeMap<DateTime<Utc>, Decimal>>,
}

impl Tables {
    fn sum_where(
        &self,
        user_id: UserId,
        keep: impl Fn(&RewardEvent) -> bool,
    ) -> Result<Holdings, LedgerError> {
        let mut totals = Holdings::new();
        for reward in self
            .rewards
            .values()
            .filter(|r| r.user_id == user_id && keep(r))
        {
            let total = totals.entry(reward.symbol.clone()).or_insert(Decimal::ZERO);
            *total = total.checked_add(reward.quantity).ok_or_else(|| {
                LedgerError::Internal(format!(
                    "{} quantity of user {user_id} is out of range",
                    reward.symbol
                ))
            })?;
        }
        Ok(totals)
    }
}

/// Memory-backed [`RewardStore`] and [`PriceSource`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reward events.
    pub async fn reward_count(&self) -> usize {
        self.tables.read().await.rewards.len()
    }

    /// Number of stored ledger lines.
    pub async fn ledger_len(&self) -> usize {
        self.tables.read().await.ledger.len()
    }

    /// Number of known users.
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl RewardStore for InMemoryStore {
    async fn find_reward_by_event_id(
        &self,
        event_id: EventId,
    ) -> Result<Option<RewardEvent>, LedgerError> {
        Ok(self.tables.read().await.rewards.get(&event_id).cloned())
    }

    async fn create_user_if_absent(&self, user_id: UserId) -> Result<User, LedgerError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.entry(user_id).or_insert_with(|| {
            tracing::info!(%user_id, "created new user");
            User {
                id: user_id,
                created_at: Utc::now(),
            }
        });
        Ok(user.clone())
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
        batch.totals().ensure_balanced()?;

        let mut tables = self.tables.write().await;
        if tables.rewards.contains_key(&reward.event_id) {
            return Ok(AppendOutcome::DuplicateEvent);
        }
        tables.rewards.insert(reward.event_id, reward.clone());
        tables.ledger.extend(batch.entries().iter().cloned());
        Ok(AppendOutcome::Committed)
    }

    async fn sum_quantity_as_of(
        &self,
        user_id: UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Holdings, LedgerError> {
        let tables = self.tables.read().await;
        tables.sum_where(user_id, |r| r.timestamp <= as_of)
    }

    async fn sum_quantity_in_window(
        &self,
        user_id: UserId,
        window: &DayWindow,
    ) -> Result<Holdings, LedgerError> {
        let tables = self.tables.read().await;
        tables.sum_where(user_id, |r| window.contains(r.timestamp))
    }

    async fn rewards_in_window(
        &self,
        user_id: UserId,
        window: &DayWindow,
    ) -> Result<Vec<RewardEvent>, LedgerError> {
        let tables = self.tables.read().await;
        let mut rewards: Vec<RewardEvent> = tables
            .rewards
            .values()
            .filter(|r| r.user_id == user_id && window.contains(r.timestamp))
            .cloned()
            .collect();
        rewards.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rewards)
    }

    async fn ledger_entries_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ledger
            .iter()
            .filter(|entry| entry.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn ledger_totals(&self) -> Result<LedgerTotals, LedgerError> {
        Ok(LedgerTotals::of(&self.tables.read().await.ledger))
    }
}

#[async_trait]
impl PriceSource for InMemoryStore {
    async fn latest_price(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<StockPriceSnapshot>, LedgerError> {
        let tables = self.tables.read().await;
        Ok(tables.prices.get(symbol).and_then(|history| {
            history
                .last_key_value()
                .map(|(at, price)| StockPriceSnapshot::new(symbol.clone(), *price, *at))
        }))
    }

    async fn price_as_of(
        &self,
        symbol: &Symbol,
        instant: DateTime<Utc>,
    ) -> Result<Option<StockPriceSnapshot>, LedgerError> {
        let tables = self.tables.read().await;
        Ok(tables.prices.get(symbol).and_then(|history| {
            history
                .range(..=instant)
                .next_back()
                .map(|(at, price)| StockPriceSnapshot::new(symbol.clone(), *price, *at))
        }))
    }

    async fn all_latest_prices(&self) -> Result<BTreeMap<Symbol, Decimal>, LedgerError> {
        let tables = self.tables.read().await;
        Ok(tables
            .prices
            .iter()
            .filter_map(|(symbol, history)| {
                history
                    .last_key_value()
                    .map(|(_, price)| (symbol.clone(), *price))
            })
            .collect())
    }

    async fn upsert_price(&self, snapshot: &StockPriceSnapshot) -> Result<(), LedgerError> {
        let mut tables = self.tables.write().await;
        tables
            .prices
            .entry(snapshot.symbol.clone())
            .or_default()
            .insert(snapshot.observed_at, snapshot.price);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::RewardRequest;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn symbol(raw: &str) -> Symbol {
        let Ok(symbol) = Symbol::parse(raw) else {
            panic!("valid symbol {raw}");
        };
        symbol
    }

    fn reward(user_id: UserId, raw: &str, qty: Decimal, at: DateTime<Utc>) -> RewardEvent {
        let Ok(request) = RewardRequest::new(user_id, symbol(raw), qty, at, EventId::new()) else {
            panic!("valid request");
        };
        RewardEvent::from_request(&request)
    }

    fn batch(reward: &RewardEvent) -> LedgerBatch {
        let Ok(batch) = LedgerBatch::for_reward(reward, dec!(100), dec!(23.91)) else {
            panic!("balanced batch");
        };
        batch
    }

    #[tokio::test]
    async fn append_is_unique_per_event() {
        let store = InMemoryStore::new();
        let first = reward(UserId::new(), "TCS", dec!(1), Utc::now());
        let outcome = store.append_reward_and_ledger(&first, &batch(&first)).await;
        assert_eq!(outcome.ok(), Some(AppendOutcome::Committed));

        let mut replay = reward(UserId::new(), "INFY", dec!(3), Utc::now());
        replay.event_id = first.event_id;
        let Ok(replay_batch) = LedgerBatch::for_reward(&replay, dec!(10), dec!(23.60)) else {
            panic!("balanced batch");
        };
        let outcome = store.append_reward_and_ledger(&replay, &replay_batch).await;
        assert_eq!(outcome.ok(), Some(AppendOutcome::DuplicateEvent));

        assert_eq!(store.reward_count().await, 1);
        assert_eq!(store.ledger_len().await, 3);
    }

    #[tokio::test]
    async fn mismatched_batch_writes_nothing() {
        let store = InMemoryStore::new();
        let a = reward(UserId::new(), "TCS", dec!(1), Utc::now());
        let b = reward(UserId::new(), "TCS", dec!(1), Utc::now());
        let result = store.append_reward_and_ledger(&a, &batch(&b)).await;
        assert!(matches!(result, Err(LedgerError::Internal(_))));
        assert_eq!(store.reward_count().await, 0);
        assert_eq!(store.ledger_len().await, 0);
    }

    #[tokio::test]
    async fn sums_respect_as_of_and_user() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let now = Utc::now();
        for r in [
            reward(user, "TCS", dec!(1.5), now - Duration::days(2)),
            reward(user, "TCS", dec!(2), now - Duration::hours(1)),
            reward(user, "INFY", dec!(4), now + Duration::hours(1)),
            reward(UserId::new(), "TCS", dec!(100), now - Duration::days(2)),
        ] {
            let outcome = store.append_reward_and_ledger(&r, &batch(&r)).await;
            assert_eq!(outcome.ok(), Some(AppendOutcome::Committed));
        }

        let Ok(holdings) = store.sum_quantity_as_of(user, now).await else {
            panic!("sum failed");
        };
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings.get(&symbol("TCS")), Some(&dec!(3.5)));
    }

    #[tokio::test]
    async fn oversized_holdings_sum_is_an_error() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let now = Utc::now();
        for _ in 0..2 {
            let r = reward(user, "TCS", Decimal::MAX, now - Duration::hours(1));
            let Ok(zero_priced) = LedgerBatch::for_reward(&r, Decimal::ZERO, Decimal::ZERO) else {
                panic!("balanced batch");
            };
            let outcome = store.append_reward_and_ledger(&r, &zero_priced).await;
            assert_eq!(outcome.ok(), Some(AppendOutcome::Committed));
        }

        let result = store.sum_quantity_as_of(user, now).await;
        assert!(matches!(result, Err(LedgerError::Internal(_))));
    }

    #[tokio::test]
    async fn window_queries_are_half_open_and_sorted() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let Some(window) = DayWindow::containing(Utc::now()) else {
            panic!("window");
        };
        let early = reward(user, "TCS", dec!(1), window.start);
        let late = reward(user, "INFY", dec!(2), window.start + Duration::hours(5));
        let outside = reward(user, "TCS", dec!(7), window.end);
        for r in [&early, &late, &outside] {
            let outcome = store.append_reward_and_ledger(r, &batch(r)).await;
            assert_eq!(outcome.ok(), Some(AppendOutcome::Committed));
        }

        let Ok(rewards) = store.rewards_in_window(user, &window).await else {
            panic!("query failed");
        };
        let ids: Vec<EventId> = rewards.iter().map(|r| r.event_id).collect();
        assert_eq!(ids, vec![late.event_id, early.event_id]);

        let Ok(today) = store.sum_quantity_in_window(user, &window).await else {
            panic!("sum failed");
        };
        assert_eq!(today.get(&symbol("TCS")), Some(&dec!(1)));
        assert_eq!(today.get(&symbol("INFY")), Some(&dec!(2)));
    }

    #[tokio::test]
    async fn price_history_latest_and_as_of() {
        let store = InMemoryStore::new();
        let tcs = symbol("TCS");
        let now = Utc::now();
        for (offset, price) in [(3, dec!(3400)), (1, dec!(3500))] {
            let snapshot = StockPriceSnapshot::new(tcs.clone(), price, now - Duration::days(offset));
            assert!(store.upsert_price(&snapshot).await.is_ok());
        }

        let latest = store.latest_price(&tcs).await.ok().flatten();
        assert_eq!(latest.map(|s| s.price), Some(dec!(3500)));

        let as_of = store.price_as_of(&tcs, now - Duration::days(2)).await.ok().flatten();
        assert_eq!(as_of.map(|s| s.price), Some(dec!(3400)));

        let before = store.price_as_of(&tcs, now - Duration::days(5)).await.ok().flatten();
        assert!(before.is_none());

        let all = store.all_latest_prices().await.unwrap_or_default();
        assert_eq!(all.get(&tcs), Some(&dec!(3500)));
    }

    #[tokio::test]
    async fn upsert_replaces_same_instant() {
        let store = InMemoryStore::new();
        let tcs = symbol("TCS");
        let at = Utc::now();
        let _ = store.upsert_price(&StockPriceSnapshot::new(tcs.clone(), dec!(1), at)).await;
        let _ = store.upsert_price(&StockPriceSnapshot::new(tcs.clone(), dec!(2), at)).await;
        let latest = store.latest_price(&tcs).await.ok().flatten();
        assert_eq!(latest.map(|s| s.price), Some(dec!(2)));
    }

    #[tokio::test]
    async fn create_user_is_idempotent() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let first = store.create_user_if_absent(user).await.ok();
        let second = store.create_user_if_absent(user).await.ok();
        assert_eq!(first, second);
        assert_eq!(store.user_count().await, 1);
    }
}
