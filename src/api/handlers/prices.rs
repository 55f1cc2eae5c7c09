//! Price lookup handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::PriceDto;
use crate::app_state::AppState;
use crate::domain::Symbol;
use crate::error::{ErrorResponse, LedgerError};

/// `GET /prices`: Latest price of every known symbol.
///
/// # Errors
///
/// Returns [`LedgerError::Persistence`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/prices",
    tag = "Prices",
    summary = "List latest prices",
    responses(
        (status = 200, description = "Latest prices, sorted by symbol", body = Vec<PriceDto>),
    )
)]
pub async fn list_prices(State(state): State<AppState>) -> Result<impl IntoResponse, LedgerError> {
    let prices = state.price_service.all_latest_prices().await?;
    let body: Vec<PriceDto> = prices
        .into_iter()
        .map(|(symbol, price)| PriceDto {
            symbol: symbol.into(),
            price,
            observed_at: None,
        })
        .collect();
    Ok(Json(body))
}

/// `GET /prices/{symbol}`: Latest snapshot of one symbol.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] for a malformed symbol and
/// [`LedgerError::PriceNotFound`] if it was never priced.
#[utoipa::path(
    get,
    path = "/api/v1/prices/{symbol}",
    tag = "Prices",
    summary = "Get latest price",
    params(
        ("symbol" = String, Path, description = "Stock symbol, case-insensitive"),
    ),
    responses(
        (status = 200, description = "Latest snapshot", body = PriceDto),
        (status = 404, description = "Symbol never priced", body = ErrorResponse),
    )
)]
pub async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, LedgerError> {
    let symbol = Symbol::parse(&symbol)?;
    let snapshot = state.price_service.latest_price(&symbol).await?;
    Ok(Json(PriceDto::from(snapshot)))
}

/// Price routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/prices", get(list_prices))
        .route("/prices/{symbol}", get(get_price))
}
