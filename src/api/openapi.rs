//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    CreateRewardRequest, CreateRewardResponse, FeeBreakdownDto, HistoricalValueDto, HoldingDto,
    LedgerBalanceResponse, LedgerEntryDto, PriceDto, RewardReceiptDto, StatsResponse,
    TodayRewardDto,
};
use super::handlers::{portfolio, prices, reward, system};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI description of every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "reward-ledger",
        description = "Idempotent stock reward ledger with INR portfolio valuation."
    ),
    paths(
        reward::create_reward,
        reward::get_ledger_for_event,
        reward::get_ledger_balance,
        portfolio::get_today_stocks,
        portfolio::get_historical_inr,
        portfolio::get_stats,
        portfolio::get_portfolio,
        prices::list_prices,
        prices::get_price,
        system::health_handler,
    ),
    components(schemas(
        CreateRewardRequest,
        CreateRewardResponse,
        RewardReceiptDto,
        FeeBreakdownDto,
        LedgerEntryDto,
        LedgerBalanceResponse,
        TodayRewardDto,
        HistoricalValueDto,
        StatsResponse,
        HoldingDto,
        PriceDto,
        system::HealthResponse,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Rewards", description = "Reward submission"),
        (name = "Ledger", description = "Double-entry ledger inspection"),
        (name = "Portfolio", description = "Per-user valuation"),
        (name = "Prices", description = "Stock price snapshots"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;
