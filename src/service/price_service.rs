//! Price reads and the periodic price ingestion task.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{StockPriceSnapshot, Symbol, round_money};
use crate::error::LedgerError;
use crate::persistence::PriceSource;

/// Base prices of the built-in symbol universe.
pub const DEFAULT_UNIVERSE: [(&str, Decimal); 5] = [
    ("RELIANCE", dec!(2500)),
    ("TCS", dec!(3500)),
    ("INFY", dec!(1500)),
    ("HDFCBANK", dec!(1700)),
    ("ICICIBANK", dec!(950)),
];

/// Default maximum deviation from the base price, in basis points (±5%).
pub const DEFAULT_MAX_VARIATION_BPS: i64 = 500;

/// Source of fresh quotes for the ingestion task.
pub trait PriceFeed: Send + Sync + Debug {
    /// One quote per symbol the feed covers.
    fn quotes(&self) -> Vec<(Symbol, Decimal)>;
}

/// Randomized feed around fixed base prices.
#[derive(Debug, Clone)]
pub struct MockPriceFeed {
    base_prices: BTreeMap<Symbol, Decimal>,
    max_variation_bps: i64,
}

impl MockPriceFeed {
    /// Feed over the given base prices.
    #[must_use]
    pub fn new(base_prices: BTreeMap<Symbol, Decimal>) -> Self {
        Self {
            base_prices,
            max_variation_bps: DEFAULT_MAX_VARIATION_BPS,
        }
    }

    /// Feed over [`DEFAULT_UNIVERSE`].
    #[must_use]
    pub fn with_default_universe() -> Self {
        let base_prices = DEFAULT_UNIVERSE
            .iter()
            .filter_map(|(raw, price)| Symbol::parse(raw).ok().map(|s| (s, *price)))
            .collect();
        Self::new(base_prices)
    }

    /// Overrides the maximum deviation. Negative values are treated as zero.
    #[must_use]
    pub fn max_variation_bps(mut self, bps: i64) -> Self {
        self.max_variation_bps = bps.max(0);
        self
    }
}

impl PriceFeed for MockPriceFeed {
    fn quotes(&self) -> Vec<(Symbol, Decimal)> {
        let mut rng = rand::thread_rng();
        let max = self.max_variation_bps;
        self.base_prices
            .iter()
            .map(|(symbol, base)| {
                let bps = rng.gen_range(-max..=max);
                let factor = Decimal::ONE + Decimal::new(bps, 4);
                (symbol.clone(), round_money(*base * factor))
            })
            .collect()
    }
}

/// Result of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionReport {
    /// Snapshots written.
    pub stored: usize,
    /// Snapshots whose write failed.
    pub failed: usize,
}

/// Serves price lookups and writes feed quotes into the price source.
#[derive(Debug)]
pub struct PriceService {
    prices: Arc<dyn PriceSource>,
    feed: Box<dyn PriceFeed>,
}

impl PriceService {
    /// Creates a new `PriceService`.
    #[must_use]
    pub fn new(prices: Arc<dyn PriceSource>, feed: Box<dyn PriceFeed>) -> Self {
        Self { prices, feed }
    }

    /// Latest snapshot for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PriceNotFound`] if the symbol was never priced,
    /// or [`LedgerError::Persistence`] on storage failure.
    pub async fn latest_price(&self, symbol: &Symbol) -> Result<StockPriceSnapshot, LedgerError> {
        self.prices
            .latest_price(symbol)
            .await?
            .ok_or_else(|| LedgerError::PriceNotFound(symbol.to_string()))
    }

    /// Latest price of every known symbol.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on storage failure.
    pub async fn all_latest_prices(&self) -> Result<BTreeMap<Symbol, Decimal>, LedgerError> {
        self.prices.all_latest_prices().await
    }

    /// Pulls one round of quotes and stores them under a shared timestamp.
    /// A failed write is logged and does not stop the remaining symbols.
    pub async fn ingest_once(&self) -> IngestionReport {
        let observed_at = Utc::now();
        let mut report = IngestionReport::default();

        for (symbol, price) in self.feed.quotes() {
            let snapshot = StockPriceSnapshot::new(symbol, price, observed_at);
            match self.prices.upsert_price(&snapshot).await {
                Ok(()) => report.stored += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(symbol = %snapshot.symbol, error = %e, "failed to store price");
                }
            }
        }

        tracing::info!(stored = report.stored, failed = report.failed, "price ingestion complete");
        report
    }
}

/// Spawns the ingestion loop: one run immediately, then one per `period`,
/// until `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_price_ingestion(
    service: Arc<PriceService>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(period_secs = period.as_secs(), "price ingestion started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    service.ingest_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("price ingestion stopped");
    })
}
