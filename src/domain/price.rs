//! Observed stock prices.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::Symbol;

/// Price of a symbol as observed at `observed_at`.
///
/// Snapshots form a per-symbol history keyed by `(symbol, observed_at)`;
/// the latest is the one with the greatest `observed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockPriceSnapshot {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Price per share.
    pub price: Decimal,
    /// When the price was observed.
    pub observed_at: DateTime<Utc>,
}

impl StockPriceSnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(symbol: Symbol, price: Decimal, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol,
            price,
            observed_at,
        }
    }
}
