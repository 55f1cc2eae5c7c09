//! Reward service: turns reward requests into balanced, exactly-once
//! ledger records.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::{
    EventId, FeeBreakdown, LedgerBatch, LedgerEntry, LedgerTotals, RewardEvent, RewardRequest,
    Symbol, UserId,
};
use crate::error::LedgerError;
use crate::persistence::{AppendOutcome, PriceSource, RewardStore};

/// What happened to a reward request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardOutcome {
    /// The reward and its ledger lines were committed by this call.
    Recorded(RewardReceipt),
    /// The `event_id` had already been applied, by an earlier call or by a
    /// concurrent one that won the race. Nothing was written.
    AlreadyProcessed {
        /// Idempotency key of the request.
        event_id: EventId,
    },
}

/// Valuation details of a freshly recorded reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardReceipt {
    /// Identity of the new reward row.
    pub reward_id: uuid::Uuid,
    /// Idempotency key.
    pub event_id: EventId,
    /// Rewarded user.
    pub user_id: UserId,
    /// Rewarded stock.
    pub symbol: Symbol,
    /// Rewarded quantity.
    pub quantity: Decimal,
    /// Latest price used to value the reward.
    pub price: Decimal,
    /// Itemized fees.
    pub fees: FeeBreakdown,
    /// Rounded fee total.
    pub total_fees: Decimal,
    /// `price × quantity + total_fees`.
    pub total_cost: Decimal,
}

/// Orchestrates reward processing over the injected store and price source.
///
/// Stateless: every call runs the full idempotency check → user ensure →
/// price lookup → fee computation → balanced batch → atomic append
/// sequence. Concurrency control lives entirely in the store's append.
#[derive(Debug, Clone)]
pub struct RewardService {
    store: Arc<dyn RewardStore>,
    prices: Arc<dyn PriceSource>,
}

impl RewardService {
    /// Creates a new `RewardService`.
    #[must_use]
    pub fn new(store: Arc<dyn RewardStore>, prices: Arc<dyn PriceSource>) -> Self {
        Self { store, prices }
    }

    /// Applies a reward at most once per `event_id`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] if the reward's value is out of range.
    /// - [`LedgerError::PriceUnavailable`] if the symbol has never been priced.
    /// - [`LedgerError::Persistence`] on any storage failure.
    /// - [`LedgerError::LedgerImbalance`] if the ledger lines do not balance.
    ///
    /// No reward or ledger row is persisted on any error.
    pub async fn process_reward(
        &self,
        request: RewardRequest,
    ) -> Result<RewardOutcome, LedgerError> {
        let event_id = request.event_id;

        if self.store.find_reward_by_event_id(event_id).await?.is_some() {
            tracing::info!(%event_id, "reward event already processed");
            return Ok(RewardOutcome::AlreadyProcessed { event_id });
        }

        self.store.create_user_if_absent(request.user_id).await?;

        let snapshot = self
            .prices
            .latest_price(&request.symbol)
            .await?
            .ok_or_else(|| LedgerError::PriceUnavailable(request.symbol.to_string()))?;

        let fees = FeeBreakdown::compute(snapshot.price, request.quantity)?;
        let total_fees = fees.total();
        let total_cost = fees
            .transaction_value
            .checked_add(total_fees)
            .ok_or_else(|| {
                LedgerError::Validation(format!("total cost of event {event_id} is out of range"))
            })?;

        let reward = RewardEvent::from_request(&request);
        let batch = LedgerBatch::for_reward(&reward, snapshot.price, total_fees)
            .inspect_err(|e| tracing::error!(%event_id, error = %e, "refusing unbalanced ledger batch"))?;

        match self.store.append_reward_and_ledger(&reward, &batch).await {
            Ok(AppendOutcome::Committed) => {}
            Ok(AppendOutcome::DuplicateEvent) => {
                tracing::info!(%event_id, "reward event committed concurrently");
                return Ok(RewardOutcome::AlreadyProcessed { event_id });
            }
            Err(e) => {
                if matches!(e, LedgerError::LedgerImbalance { .. }) {
                    tracing::error!(%event_id, error = %e, "ledger imbalance detected at commit");
                }
                return Err(e);
            }
        }

        tracing::info!(
            %event_id,
            user_id = %request.user_id,
            symbol = %request.symbol,
            quantity = %request.quantity,
            price = %snapshot.price,
            fees = %total_fees,
            total_cost = %total_cost,
            "reward processed"
        );

        Ok(RewardOutcome::Recorded(RewardReceipt {
            reward_id: reward.id,
            event_id,
            user_id: reward.user_id,
            symbol: reward.symbol,
            quantity: reward.quantity,
            price: snapshot.price,
            fees,
            total_fees,
            total_cost,
        }))
    }

    /// Ledger lines recorded for one event.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EventNotFound`] if the event was never
    /// applied, or [`LedgerError::Persistence`] on storage failure.
    pub async fn ledger_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = self.store.ledger_entries_for_event(event_id).await?;
        if entries.is_empty() {
            return Err(LedgerError::EventNotFound(event_id.into()));
        }
        Ok(entries)
    }

    /// Debit and credit totals over the whole ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on storage failure.
    pub async fn ledger_balance(&self) -> Result<LedgerTotals, LedgerError> {
        let totals = self.store.ledger_totals().await?;
        if !totals.is_balanced() {
            tracing::error!(debit = %totals.debit, credit = %totals.credit, "global ledger out of balance");
        }
        Ok(totals)
    }
}
