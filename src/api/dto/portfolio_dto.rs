//! Portfolio query DTOs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::RewardEvent;
use crate::service::{DailyValue, Holding, PortfolioStats};

/// One reward granted today, for `GET /today-stocks/{user_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TodayRewardDto {
    /// Rewarded stock.
    pub stock_symbol: String,
    /// Rewarded quantity.
    pub quantity: Decimal,
    /// Upstream event time.
    pub timestamp: DateTime<Utc>,
    /// Idempotency key of the reward.
    pub event_id: Uuid,
}

impl From<RewardEvent> for TodayRewardDto {
    fn from(reward: RewardEvent) -> Self {
        Self {
            stock_symbol: reward.symbol.into(),
            quantity: reward.quantity,
            timestamp: reward.timestamp,
            event_id: reward.event_id.into(),
        }
    }
}

/// One day of `GET /historical-inr/{user_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoricalValueDto {
    /// Reporting date, `YYYY-MM-DD`.
    #[schema(example = "2024-03-10")]
    pub date: String,
    /// Portfolio value in INR at the end of that day.
    pub inr_value: Decimal,
}

impl From<DailyValue> for HistoricalValueDto {
    fn from(point: DailyValue) -> Self {
        Self {
            date: point.date.format("%Y-%m-%d").to_string(),
            inr_value: point.value,
        }
    }
}

/// Response body for `GET /stats/{user_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Quantity rewarded today, keyed by symbol.
    pub today_shares_by_stock: BTreeMap<String, Decimal>,
    /// Current value of all priced holdings in INR.
    pub current_portfolio_value: Decimal,
}

impl From<PortfolioStats> for StatsResponse {
    fn from(stats: PortfolioStats) -> Self {
        Self {
            today_shares_by_stock: stats
                .today_shares_by_symbol
                .into_iter()
                .map(|(symbol, quantity)| (symbol.into(), quantity))
                .collect(),
            current_portfolio_value: stats.current_portfolio_value,
        }
    }
}

/// One position of `GET /portfolio/{user_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HoldingDto {
    /// Stock symbol.
    pub stock_symbol: String,
    /// Total rewarded quantity.
    pub total_quantity: Decimal,
    /// Latest price.
    pub current_price: Decimal,
    /// Rounded position value in INR.
    pub current_value: Decimal,
}

impl From<Holding> for HoldingDto {
    fn from(holding: Holding) -> Self {
        Self {
            stock_symbol: holding.symbol.into(),
            total_quantity: holding.total_quantity,
            current_price: holding.current_price,
            current_value: holding.current_value,
        }
    }
}
