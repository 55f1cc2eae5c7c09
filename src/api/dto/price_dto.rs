//! Price DTOs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::StockPriceSnapshot;

/// Latest observation of one symbol.
#[derive(Debug, Serialize, ToSchema)]
pub struct PriceDto {
    /// Stock symbol.
    pub symbol: String,
    /// Price per share in INR.
    pub price: Decimal,
    /// Observation time. Absent in the all-symbols listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl From<StockPriceSnapshot> for PriceDto {
    fn from(snapshot: StockPriceSnapshot) -> Self {
        Self {
            symbol: snapshot.symbol.into(),
            price: snapshot.price,
            observed_at: Some(snapshot.observed_at),
        }
    }
}
