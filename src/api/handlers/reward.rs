//! Reward submission and ledger inspection handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateRewardRequest, CreateRewardResponse, LedgerBalanceResponse, LedgerEntryDto,
};
use crate::app_state::AppState;
use crate::domain::EventId;
use crate::error::{ErrorResponse, LedgerError};
use crate::service::RewardOutcome;

/// `POST /reward`: Grant shares to a user, at most once per `event_id`.
///
/// # Errors
///
/// Returns [`LedgerError`] on a malformed body, a symbol without any price,
/// or a storage failure.
#[utoipa::path(
    post,
    path = "/api/v1/reward",
    tag = "Rewards",
    summary = "Record a stock reward",
    description = "Values the reward at the latest price, computes fees, and writes the reward together with three balanced ledger lines in one atomic unit. Resubmitting an `event_id` is a no-op that succeeds with status `already_processed`.",
    request_body = CreateRewardRequest,
    responses(
        (status = 201, description = "Reward recorded", body = CreateRewardResponse),
        (status = 200, description = "Event already processed", body = CreateRewardResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 422, description = "No price available for the symbol", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn create_reward(
    State(state): State<AppState>,
    payload: Result<Json<CreateRewardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let Json(body) = payload.map_err(|e| LedgerError::Validation(e.body_text()))?;
    let request = body.into_domain()?;

    let response = match state.reward_service.process_reward(request).await? {
        RewardOutcome::Recorded(receipt) => (
            StatusCode::CREATED,
            Json(CreateRewardResponse::recorded(receipt)),
        ),
        RewardOutcome::AlreadyProcessed { event_id } => (
            StatusCode::OK,
            Json(CreateRewardResponse::already_processed(event_id)),
        ),
    };
    Ok(response)
}

/// `GET /ledger/{event_id}`: Ledger lines of one reward event.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] for a malformed id and
/// [`LedgerError::EventNotFound`] if the event was never recorded.
#[utoipa::path(
    get,
    path = "/api/v1/ledger/{event_id}",
    tag = "Ledger",
    summary = "Get ledger lines for an event",
    description = "Returns the stock, cash and fee lines written for the reward event.",
    params(
        ("event_id" = uuid::Uuid, Path, description = "Reward idempotency key"),
    ),
    responses(
        (status = 200, description = "Ledger lines", body = Vec<LedgerEntryDto>),
        (status = 400, description = "Invalid event id", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_ledger_for_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, LedgerError> {
    let event_id = EventId::parse(&event_id)?;
    let entries = state.reward_service.ledger_for_event(event_id).await?;
    let body: Vec<LedgerEntryDto> = entries.into_iter().map(LedgerEntryDto::from).collect();
    Ok(Json(body))
}

/// `GET /ledger/balance`: Global debit and credit totals.
///
/// # Errors
///
/// Returns [`LedgerError::Persistence`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/ledger/balance",
    tag = "Ledger",
    summary = "Global ledger balance",
    description = "Sums every debit and credit in the ledger. `balanced` is false only if an invariant was broken.",
    responses(
        (status = 200, description = "Ledger totals", body = LedgerBalanceResponse),
    )
)]
pub async fn get_ledger_balance(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, LedgerError> {
    let totals = state.reward_service.ledger_balance().await?;
    Ok(Json(LedgerBalanceResponse::from(totals)))
}

/// Reward and ledger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reward", post(create_reward))
        .route("/ledger/balance", get(get_ledger_balance))
        .route("/ledger/{event_id}", get(get_ledger_for_event))
}
