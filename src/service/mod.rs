//! Service layer: business logic orchestration.
//!
//! [`RewardService`] applies rewards exactly once, [`PortfolioService`]
//! answers the read-side queries, and [`PriceService`] owns price reads and
//! the periodic ingestion task.

pub mod portfolio_service;
pub mod price_service;
pub mod reward_service;

pub use portfolio_service::{DailyValue, Holding, PortfolioService, PortfolioStats};
pub use price_service::{
    IngestionReport, MockPriceFeed, PriceFeed, PriceService, spawn_price_ingestion,
};
pub use reward_service::{RewardOutcome, RewardReceipt, RewardService};
