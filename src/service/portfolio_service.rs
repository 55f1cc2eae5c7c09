//! Read-side projections over a user's rewards: today's rewards, current
//! holdings, stats, and the trailing daily valuation series.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::reporting_time::{HISTORY_DAYS, end_of_day, trailing_dates};
use crate::domain::{DayWindow, RewardEvent, Symbol, UserId, round_money};
use crate::error::LedgerError;
use crate::persistence::{Holdings, PriceSource, RewardStore};

/// One held symbol valued at its latest price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holding {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Sum of all rewarded quantities.
    pub total_quantity: Decimal,
    /// Latest recorded price.
    pub current_price: Decimal,
    /// `total_quantity × current_price`, rounded to 2 decimals.
    pub current_value: Decimal,
}

/// Today's reward totals plus the current portfolio value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioStats {
    /// Quantity rewarded per symbol during the current reporting day.
    pub today_shares_by_symbol: Holdings,
    /// Value of all priced holdings at latest prices, rounded to 2 decimals.
    pub current_portfolio_value: Decimal,
}

/// Portfolio value at the end of one reporting day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyValue {
    /// Reporting-timezone date.
    pub date: NaiveDate,
    /// Rounded value, always positive.
    pub value: Decimal,
}

/// Computes user-facing portfolio views.
///
/// Every public query has an `*_at` twin taking the clock reading
/// explicitly. The plain variants use [`Utc::now`].
#[derive(Debug, Clone)]
pub struct PortfolioService {
    store: Arc<dyn RewardStore>,
    prices: Arc<dyn PriceSource>,
}

impl PortfolioService {
    /// Creates a new `PortfolioService`.
    #[must_use]
    pub fn new(store: Arc<dyn RewardStore>, prices: Arc<dyn PriceSource>) -> Self {
        Self { store, prices }
    }

    /// Rewards granted during the current reporting day, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on storage failure.
    pub async fn today_rewards(&self, user_id: UserId) -> Result<Vec<RewardEvent>, LedgerError> {
        self.today_rewards_at(user_id, Utc::now()).await
    }

    /// [`Self::today_rewards`] evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on storage failure.
    pub async fn today_rewards_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<RewardEvent>, LedgerError> {
        let window = today_window(now)?;
        self.store.rewards_in_window(user_id, &window).await
    }

    /// Current holdings per symbol, sorted by symbol. Symbols without any
    /// recorded price are left out.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on storage failure and
    /// [`LedgerError::Internal`] if a value is out of range.
    pub async fn portfolio(&self, user_id: UserId) -> Result<Vec<Holding>, LedgerError> {
        self.portfolio_at(user_id, Utc::now()).await
    }

    /// [`Self::portfolio`] evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on storage failure and
    /// [`LedgerError::Internal`] if a value is out of range.
    pub async fn portfolio_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Holding>, LedgerError> {
        let holdings = self.store.sum_quantity_as_of(user_id, now).await?;
        let latest = self.prices.all_latest_prices().await?;

        let mut positions = Vec::with_capacity(holdings.len());
        for (symbol, total_quantity) in holdings {
            let Some(&current_price) = latest.get(&symbol) else {
                tracing::debug!(%user_id, %symbol, "no price recorded, leaving out of portfolio");
                continue;
            };
            positions.push(Holding {
                current_value: round_money(position_value(total_quantity, current_price)?),
                symbol,
                total_quantity,
                current_price,
            });
        }
        Ok(positions)
    }

    /// Today's per-symbol reward totals and the current portfolio value.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on storage failure and
    /// [`LedgerError::Internal`] if the total is out of range.
    pub async fn stats(&self, user_id: UserId) -> Result<PortfolioStats, LedgerError> {
        self.stats_at(user_id, Utc::now()).await
    }

    /// [`Self::stats`] evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on storage failure and
    /// [`LedgerError::Internal`] if the total is out of range.
    pub async fn stats_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<PortfolioStats, LedgerError> {
        let window = today_window(now)?;
        let today_shares_by_symbol = self.store.sum_quantity_in_window(user_id, &window).await?;

        let holdings = self.store.sum_quantity_as_of(user_id, now).await?;
        let latest = self.prices.all_latest_prices().await?;
        let mut total = Decimal::ZERO;
        for (symbol, quantity) in &holdings {
            if let Some(&price) = latest.get(symbol) {
                total = add_value(total, position_value(*quantity, price)?)?;
            }
        }

        Ok(PortfolioStats {
            today_shares_by_symbol,
            current_portfolio_value: round_money(total),
        })
    }

    /// End-of-day values for the trailing [`HISTORY_DAYS`] days, yesterday
    /// first. Days on which the valuation is zero are omitted.
    ///
    /// Each symbol is valued at its last price observed at or before the
    /// day's end. If none exists the latest known price is used instead,
    /// and if there is no price at all the symbol is skipped for that day.
    /// Price lookup failures are logged and handled the same way.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if a holdings read fails and
    /// [`LedgerError::Internal`] if a day's value is out of range.
    pub async fn historical_value(&self, user_id: UserId) -> Result<Vec<DailyValue>, LedgerError> {
        self.historical_value_at(user_id, Utc::now()).await
    }

    /// [`Self::historical_value`] evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if a holdings read fails and
    /// [`LedgerError::Internal`] if a day's value is out of range.
    pub async fn historical_value_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<DailyValue>, LedgerError> {
        let mut latest_cache: HashMap<Symbol, Option<Decimal>> = HashMap::new();
        let mut series = Vec::new();

        for date in trailing_dates(now, HISTORY_DAYS) {
            let Some(day_end) = end_of_day(date) else {
                continue;
            };
            let holdings = self.store.sum_quantity_as_of(user_id, day_end).await?;
            if holdings.is_empty() {
                continue;
            }

            let mut total = Decimal::ZERO;
            for (symbol, quantity) in &holdings {
                if let Some(price) = self.price_for_day(symbol, day_end, &mut latest_cache).await {
                    total = add_value(total, position_value(*quantity, price)?)?;
                }
            }

            let value = round_money(total);
            if value > Decimal::ZERO {
                series.push(DailyValue { date, value });
            }
        }

        Ok(series)
    }

    async fn price_for_day(
        &self,
        symbol: &Symbol,
        day_end: DateTime<Utc>,
        latest_cache: &mut HashMap<Symbol, Option<Decimal>>,
    ) -> Option<Decimal> {
        match self.prices.price_as_of(symbol, day_end).await {
            Ok(Some(snapshot)) => return Some(snapshot.price),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%symbol, %day_end, error = %e, "as-of price lookup failed, using latest");
            }
        }

        if let Some(cached) = latest_cache.get(symbol) {
            return *cached;
        }
        let latest = match self.prices.latest_price(symbol).await {
            Ok(snapshot) => snapshot.map(|s| s.price),
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "latest price lookup failed, skipping symbol");
                None
            }
        };
        if latest.is_none() {
            tracing::debug!(%symbol, "no price recorded, skipping symbol in valuation");
        }
        latest_cache.insert(symbol.clone(), latest);
        latest
    }
}

fn today_window(now: DateTime<Utc>) -> Result<DayWindow, LedgerError> {
    DayWindow::containing(now)
        .ok_or_else(|| LedgerError::Internal(format!("no reporting day for {now}")))
}

fn position_value(quantity: Decimal, price: Decimal) -> Result<Decimal, LedgerError> {
    quantity.checked_mul(price).ok_or_else(|| {
        LedgerError::Internal(format!("value of {quantity} shares at {price} is out of range"))
    })
}

fn add_value(total: Decimal, value: Decimal) -> Result<Decimal, LedgerError> {
    total
        .checked_add(value)
        .ok_or_else(|| LedgerError::Internal("portfolio value is out of range".to_string()))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        EventId, LedgerBatch, LedgerEntry, LedgerTotals, RewardRequest, StockPriceSnapshot, User,
    };
    use crate::persistence::{AppendOutcome, InMemoryStore};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn symbol(raw: &str) -> Symbol {
        let Ok(symbol) = Symbol::parse(raw) else {
            panic!("valid symbol {raw}");
        };
        symbol
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        let Some(instant) = Utc.with_ymd_and_hms(y, m, d, h, min, 0).single() else {
            panic!("valid instant");
        };
        instant
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(y, m, d) else {
            panic!("valid date");
        };
        date
    }

    struct Fixture {
        memory: Arc<InMemoryStore>,
        service: PortfolioService,
        user: UserId,
    }

    impl Fixture {
        fn new() -> Self {
            let memory = Arc::new(InMemoryStore::new());
            let store: Arc<dyn RewardStore> = Arc::clone(&memory) as Arc<dyn RewardStore>;
            let prices: Arc<dyn PriceSource> = Arc::clone(&memory) as Arc<dyn PriceSource>;
            Self {
                memory,
                service: PortfolioService::new(store, prices),
                user: UserId::new(),
            }
        }

        async fn reward(&self, raw: &str, quantity: Decimal, when: DateTime<Utc>) {
            let Ok(request) =
                RewardRequest::new(self.user, symbol(raw), quantity, when, EventId::new())
            else {
                panic!("valid request");
            };
            let reward = RewardEvent::from_request(&request);
            let Ok(batch) = LedgerBatch::for_reward(&reward, dec!(1), dec!(0)) else {
                panic!("balanced batch");
            };
            if self.memory.append_reward_and_ledger(&reward, &batch).await.is_err() {
                panic!("append failed");
            }
        }

        async fn price(&self, raw: &str, price: Decimal, when: DateTime<Utc>) {
            let snapshot = StockPriceSnapshot::new(symbol(raw), price, when);
            if self.memory.upsert_price(&snapshot).await.is_err() {
                panic!("price upsert failed");
            }
        }
    }

    // 06:00 UTC is 11:30 IST on 2024-03-11.
    fn now() -> DateTime<Utc> {
        at(2024, 3, 11, 6, 0)
    }

    #[tokio::test]
    async fn today_uses_reporting_day_boundaries() {
        let fx = Fixture::new();
        // 18:30 UTC on the 10th is IST midnight starting the 11th.
        fx.reward("TCS", dec!(1), at(2024, 3, 10, 18, 30)).await;
        fx.reward("INFY", dec!(2), at(2024, 3, 11, 5, 0)).await;
        fx.reward("TCS", dec!(4), at(2024, 3, 10, 18, 29)).await;

        let Ok(rewards) = fx.service.today_rewards_at(fx.user, now()).await else {
            panic!("expected rewards");
        };
        let symbols: Vec<&str> = rewards.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["INFY", "TCS"]);
    }

    #[tokio::test]
    async fn portfolio_values_priced_symbols_only() {
        let fx = Fixture::new();
        fx.reward("TCS", dec!(1.5), at(2024, 3, 1, 5, 0)).await;
        fx.reward("TCS", dec!(0.5), at(2024, 3, 2, 5, 0)).await;
        fx.reward("INFY", dec!(3), at(2024, 3, 2, 5, 0)).await;
        fx.reward("WIPRO", dec!(9), at(2024, 3, 2, 5, 0)).await;
        fx.price("TCS", dec!(3000), at(2024, 3, 1, 0, 0)).await;
        fx.price("TCS", dec!(3333.335), at(2024, 3, 5, 0, 0)).await;
        fx.price("INFY", dec!(1500), at(2024, 3, 5, 0, 0)).await;

        let Ok(positions) = fx.service.portfolio_at(fx.user, now()).await else {
            panic!("expected portfolio");
        };
        assert_eq!(positions.len(), 2);
        let Some(infy) = positions.first() else {
            panic!("missing INFY");
        };
        assert_eq!(infy.symbol.as_str(), "INFY");
        assert_eq!(infy.current_value, dec!(4500.00));
        let Some(tcs) = positions.get(1) else {
            panic!("missing TCS");
        };
        assert_eq!(tcs.total_quantity, dec!(2.0));
        assert_eq!(tcs.current_price, dec!(3333.335));
        assert_eq!(tcs.current_value, dec!(6666.67));
    }

    #[tokio::test]
    async fn stats_combines_today_and_total_value() {
        let fx = Fixture::new();
        fx.reward("TCS", dec!(0.333), at(2024, 3, 11, 4, 0)).await;
        fx.reward("INFY", dec!(1), at(2024, 3, 5, 4, 0)).await;
        fx.reward("WIPRO", dec!(2), at(2024, 3, 11, 4, 30)).await;
        fx.price("TCS", dec!(3000.01), at(2024, 3, 1, 0, 0)).await;
        fx.price("INFY", dec!(1500), at(2024, 3, 1, 0, 0)).await;

        let Ok(stats) = fx.service.stats_at(fx.user, now()).await else {
            panic!("expected stats");
        };
        assert_eq!(stats.today_shares_by_symbol.len(), 2);
        assert_eq!(stats.today_shares_by_symbol.get(&symbol("TCS")), Some(&dec!(0.333)));
        assert_eq!(stats.today_shares_by_symbol.get(&symbol("WIPRO")), Some(&dec!(2)));
        // 0.333 × 3000.01 + 1 × 1500 = 2499.00333
        assert_eq!(stats.current_portfolio_value, dec!(2499.00));
    }

    #[tokio::test]
    async fn history_uses_as_of_prices_with_latest_fallback() {
        let fx = Fixture::new();
        // IST 10:30 on the 8th.
        fx.reward("TCS", dec!(2), at(2024, 3, 8, 5, 0)).await;
        fx.reward("INFY", dec!(1), at(2024, 3, 8, 5, 0)).await;
        fx.reward("WIPRO", dec!(5), at(2024, 3, 8, 5, 0)).await;
        fx.price("TCS", dec!(3000), at(2024, 3, 7, 0, 0)).await;
        // IST 17:30 on the 9th.
        fx.price("TCS", dec!(3100), at(2024, 3, 9, 12, 0)).await;
        // Only priced after every historical day ended.
        fx.price("INFY", dec!(1500), at(2024, 3, 11, 5, 0)).await;

        let Ok(series) = fx.service.historical_value_at(fx.user, now()).await else {
            panic!("expected history");
        };
        assert_eq!(
            series,
            vec![
                DailyValue {
                    date: date(2024, 3, 10),
                    value: dec!(7700)
                },
                DailyValue {
                    date: date(2024, 3, 9),
                    value: dec!(7700)
                },
                DailyValue {
                    date: date(2024, 3, 8),
                    value: dec!(7500)
                },
            ]
        );
    }

    #[tokio::test]
    async fn history_never_exceeds_window() {
        let fx = Fixture::new();
        fx.reward("TCS", dec!(1), at(2024, 1, 1, 0, 0)).await;
        fx.price("TCS", dec!(10), at(2023, 12, 31, 0, 0)).await;

        let Ok(series) = fx.service.historical_value_at(fx.user, now()).await else {
            panic!("expected history");
        };
        assert_eq!(series.len(), 30);
        assert_eq!(series.first().map(|d| d.date), Some(date(2024, 3, 10)));
        assert_eq!(series.last().map(|d| d.date), Some(date(2024, 2, 10)));
    }

    #[tokio::test]
    async fn unpriced_history_is_empty() {
        let fx = Fixture::new();
        fx.reward("WIPRO", dec!(1), at(2024, 3, 1, 0, 0)).await;
        let Ok(series) = fx.service.historical_value_at(fx.user, now()).await else {
            panic!("expected history");
        };
        assert!(series.is_empty());
    }

    fn unreachable() -> LedgerError {
        LedgerError::Persistence("connection refused".to_string())
    }

    /// Serves prices from memory but fails the selected lookups.
    #[derive(Debug)]
    struct FailingPrices {
        inner: Arc<InMemoryStore>,
        fail_latest: bool,
    }

    #[async_trait]
    impl PriceSource for FailingPrices {
        async fn latest_price(
            &self,
            symbol: &Symbol,
        ) -> Result<Option<StockPriceSnapshot>, LedgerError> {
            if self.fail_latest {
                return Err(unreachable());
            }
            self.inner.latest_price(symbol).await
        }
        async fn price_as_of(
            &self,
            _: &Symbol,
            _: DateTime<Utc>,
        ) -> Result<Option<StockPriceSnapshot>, LedgerError> {
            Err(unreachable())
        }
        async fn all_latest_prices(&self) -> Result<BTreeMap<Symbol, Decimal>, LedgerError> {
            self.inner.all_latest_prices().await
        }
        async fn upsert_price(&self, snapshot: &StockPriceSnapshot) -> Result<(), LedgerError> {
            self.inner.upsert_price(snapshot).await
        }
    }

    #[derive(Debug)]
    struct UnreachableStore;

    #[async_trait]
    impl RewardStore for UnreachableStore {
        async fn find_reward_by_event_id(
            &self,
            _: EventId,
        ) -> Result<Option<RewardEvent>, LedgerError> {
            Err(unreachable())
        }
        async fn create_user_if_absent(&self, _: UserId) -> Result<User, LedgerError> {
            Err(unreachable())
        }
        async fn append_reward_and_ledger(
            &self,
            _: &RewardEvent,
            _: &LedgerBatch,
        ) -> Result<AppendOutcome, LedgerError> {
            Err(unreachable())
        }
        async fn sum_quantity_as_of(
            &self,
            _: UserId,
            _: DateTime<Utc>,
        ) -> Result<Holdings, LedgerError> {
            Err(unreachable())
        }
        async fn sum_quantity_in_window(
            &self,
            _: UserId,
            _: &DayWindow,
        ) -> Result<Holdings, LedgerError> {
            Err(unreachable())
        }
        async fn rewards_in_window(
            &self,
            _: UserId,
            _: &DayWindow,
        ) -> Result<Vec<RewardEvent>, LedgerError> {
            Err(unreachable())
        }
        async fn ledger_entries_for_event(
            &self,
            _: EventId,
        ) -> Result<Vec<LedgerEntry>, LedgerError> {
            Err(unreachable())
        }
        async fn ledger_totals(&self) -> Result<LedgerTotals, LedgerError> {
            Err(unreachable())
        }
    }

    impl Fixture {
        fn with_failing_prices(&self, fail_latest: bool) -> PortfolioService {
            PortfolioService::new(
                Arc::clone(&self.memory) as Arc<dyn RewardStore>,
                Arc::new(FailingPrices {
                    inner: Arc::clone(&self.memory),
                    fail_latest,
                }),
            )
        }
    }

    #[tokio::test]
    async fn history_falls_back_to_latest_when_as_of_lookup_fails() {
        let fx = Fixture::new();
        fx.reward("TCS", dec!(2), at(2024, 3, 8, 5, 0)).await;
        fx.price("TCS", dec!(3000), at(2024, 3, 7, 0, 0)).await;
        fx.price("TCS", dec!(3100), at(2024, 3, 9, 12, 0)).await;

        let service = fx.with_failing_prices(false);
        let Ok(series) = service.historical_value_at(fx.user, now()).await else {
            panic!("price failures must not fail history");
        };
        let values: Vec<(NaiveDate, Decimal)> = series.iter().map(|d| (d.date, d.value)).collect();
        assert_eq!(
            values,
            vec![
                (date(2024, 3, 10), dec!(6200)),
                (date(2024, 3, 9), dec!(6200)),
                (date(2024, 3, 8), dec!(6200)),
            ]
        );
    }

    #[tokio::test]
    async fn history_skips_symbols_whose_lookups_all_fail() {
        let fx = Fixture::new();
        fx.reward("TCS", dec!(2), at(2024, 3, 8, 5, 0)).await;
        fx.price("TCS", dec!(3000), at(2024, 3, 7, 0, 0)).await;

        let service = fx.with_failing_prices(true);
        let Ok(series) = service.historical_value_at(fx.user, now()).await else {
            panic!("price failures must not fail history");
        };
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn holdings_read_failure_fails_every_view() {
        let memory = Arc::new(InMemoryStore::new());
        let service = PortfolioService::new(Arc::new(UnreachableStore), memory);
        let user = UserId::new();

        assert!(matches!(
            service.historical_value_at(user, now()).await,
            Err(LedgerError::Persistence(_))
        ));
        assert!(matches!(
            service.portfolio_at(user, now()).await,
            Err(LedgerError::Persistence(_))
        ));
        assert!(matches!(
            service.stats_at(user, now()).await,
            Err(LedgerError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn oversized_valuation_is_an_error() {
        let fx = Fixture::new();
        fx.reward("TCS", Decimal::MAX / dec!(10), at(2024, 3, 8, 5, 0)).await;
        fx.price("TCS", dec!(3500), at(2024, 3, 7, 0, 0)).await;

        assert!(matches!(
            fx.service.portfolio_at(fx.user, now()).await,
            Err(LedgerError::Internal(_))
        ));
        assert!(matches!(
            fx.service.stats_at(fx.user, now()).await,
            Err(LedgerError::Internal(_))
        ));
        assert!(matches!(
            fx.service.historical_value_at(fx.user, now()).await,
            Err(LedgerError::Internal(_))
        ));
    }
}
