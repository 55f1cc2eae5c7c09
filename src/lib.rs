//! # reward-ledger
//!
//! HTTP service that grants fractional stock rewards to users, records each
//! reward exactly once as a balanced double-entry ledger batch, and values
//! user portfolios in INR from periodically ingested price snapshots.
//!
//! Each reward is keyed by a caller-chosen `event_id`. Replays and
//! concurrent duplicates of the same key are applied once and answered as
//! successes. All monetary math uses [`rust_decimal::Decimal`].
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── RewardService / PortfolioService / PriceService (service/)
//!     │       └── fees, ledger batches, IST calendar (domain/)
//!     │
//!     ├── RewardStore + PriceSource traits (persistence/)
//!     │       ├── PostgresStore
//!     │       └── InMemoryStore
//!     │
//!     └── price ingestion task (service/price_service)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
