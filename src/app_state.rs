//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::persistence::{PriceSource, RewardStore};
use crate::service::{MockPriceFeed, PortfolioService, PriceService, RewardService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Reward processing and ledger reads.
    pub reward_service: Arc<RewardService>,
    /// Portfolio, stats and history queries.
    pub portfolio_service: Arc<PortfolioService>,
    /// Price reads and ingestion.
    pub price_service: Arc<PriceService>,
}

impl AppState {
    /// Wires all services over one store and one price source, with the
    /// built-in mock price feed.
    #[must_use]
    pub fn new(store: Arc<dyn RewardStore>, prices: Arc<dyn PriceSource>) -> Self {
        Self {
            reward_service: Arc::new(RewardService::new(Arc::clone(&store), Arc::clone(&prices))),
            portfolio_service: Arc::new(PortfolioService::new(store, Arc::clone(&prices))),
            price_service: Arc::new(PriceService::new(
                prices,
                Box::new(MockPriceFeed::with_default_universe()),
            )),
        }
    }
}
