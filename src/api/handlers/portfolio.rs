//! Per-user portfolio handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{HistoricalValueDto, HoldingDto, StatsResponse, TodayRewardDto};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, LedgerError};

/// `GET /today-stocks/{user_id}`: Rewards granted today.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] for a malformed user id, or
/// [`LedgerError::Persistence`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/today-stocks/{user_id}",
    tag = "Portfolio",
    summary = "Today's rewards",
    description = "Rewards whose event time falls in the current IST calendar day, newest first.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Today's rewards", body = Vec<TodayRewardDto>),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
    )
)]
pub async fn get_today_stocks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, LedgerError> {
    let user_id = UserId::parse(&user_id)?;
    let rewards = state.portfolio_service.today_rewards(user_id).await?;
    let body: Vec<TodayRewardDto> = rewards.into_iter().map(TodayRewardDto::from).collect();
    Ok(Json(body))
}

/// `GET /historical-inr/{user_id}`: End-of-day valuation history.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] for a malformed user id, or
/// [`LedgerError::Persistence`] if a holdings read fails.
#[utoipa::path(
    get,
    path = "/api/v1/historical-inr/{user_id}",
    tag = "Portfolio",
    summary = "Historical INR value",
    description = "Portfolio value at the end of each of the previous 30 IST days, most recent first. Days with no value are omitted.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Daily values", body = Vec<HistoricalValueDto>),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
    )
)]
pub async fn get_historical_inr(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, LedgerError> {
    let user_id = UserId::parse(&user_id)?;
    let series = state.portfolio_service.historical_value(user_id).await?;
    let body: Vec<HistoricalValueDto> =
        series.into_iter().map(HistoricalValueDto::from).collect();
    Ok(Json(body))
}

/// `GET /stats/{user_id}`: Today's shares and current value.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] for a malformed user id, or
/// [`LedgerError::Persistence`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/stats/{user_id}",
    tag = "Portfolio",
    summary = "Portfolio stats",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Stats", body = StatsResponse),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, LedgerError> {
    let user_id = UserId::parse(&user_id)?;
    let stats = state.portfolio_service.stats(user_id).await?;
    Ok(Json(StatsResponse::from(stats)))
}

/// `GET /portfolio/{user_id}`: Current holdings at latest prices.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] for a malformed user id, or
/// [`LedgerError::Persistence`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/portfolio/{user_id}",
    tag = "Portfolio",
    summary = "Current portfolio",
    description = "One entry per held symbol that has a known price, sorted by symbol.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Holdings", body = Vec<HoldingDto>),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
    )
)]
pub async fn get_portfolio(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, LedgerError> {
    let user_id = UserId::parse(&user_id)?;
    let holdings = state.portfolio_service.portfolio(user_id).await?;
    let body: Vec<HoldingDto> = holdings.into_iter().map(HoldingDto::from).collect();
    Ok(Json(body))
}

/// Portfolio routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/today-stocks/{user_id}", get(get_today_stocks))
        .route("/historical-inr/{user_id}", get(get_historical_inr))
        .route("/stats/{user_id}", get(get_stats))
        .route("/portfolio/{user_id}", get(get_portfolio))
}
