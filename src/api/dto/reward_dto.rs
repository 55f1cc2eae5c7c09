//! Reward submission and ledger inspection DTOs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    EventId, FeeBreakdown, LedgerEntry, LedgerTotals, RewardRequest, Symbol, UserId,
};
use crate::error::LedgerError;
use crate::service::RewardReceipt;

/// Request body for `POST /reward`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRewardRequest {
    /// Rewarded user.
    pub user_id: Uuid,
    /// Stock symbol, case-insensitive.
    #[schema(example = "TCS")]
    pub stock_symbol: String,
    /// Shares granted; must be greater than zero. Fractions allowed.
    #[schema(example = "2.5")]
    pub quantity: Decimal,
    /// When the reward happened upstream (RFC 3339).
    pub timestamp: DateTime<Utc>,
    /// Idempotency key. Replays with the same key are applied once.
    pub event_id: Uuid,
}

impl CreateRewardRequest {
    /// Validates the body into a domain request.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] for a bad symbol or a
    /// non-positive quantity.
    pub fn into_domain(self) -> Result<RewardRequest, LedgerError> {
        RewardRequest::new(
            UserId::from_uuid(self.user_id),
            Symbol::parse(&self.stock_symbol)?,
            self.quantity,
            self.timestamp,
            EventId::from_uuid(self.event_id),
        )
    }
}

/// Response body for `POST /reward`.
///
/// `201 Created` carries `status = "recorded"` and a receipt; a replayed
/// `event_id` answers `200 OK` with `status = "already_processed"` and no
/// receipt.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRewardResponse {
    /// Human-readable summary.
    pub message: String,
    /// Idempotency key echoed from the request.
    pub event_id: Uuid,
    /// `recorded` or `already_processed`.
    pub status: String,
    /// Valuation details, present only when this call recorded the reward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<RewardReceiptDto>,
}

impl CreateRewardResponse {
    /// Response for a reward recorded by this call.
    #[must_use]
    pub fn recorded(receipt: RewardReceipt) -> Self {
        Self {
            message: "Reward processed successfully".to_string(),
            event_id: receipt.event_id.into(),
            status: "recorded".to_string(),
            receipt: Some(receipt.into()),
        }
    }

    /// Response for a replayed `event_id`.
    #[must_use]
    pub fn already_processed(event_id: EventId) -> Self {
        Self {
            message: "Reward already processed".to_string(),
            event_id: event_id.into(),
            status: "already_processed".to_string(),
            receipt: None,
        }
    }
}

/// How a recorded reward was valued.
#[derive(Debug, Serialize, ToSchema)]
pub struct RewardReceiptDto {
    /// Identity of the stored reward.
    pub reward_id: Uuid,
    /// Rewarded user.
    pub user_id: Uuid,
    /// Normalized symbol.
    pub stock_symbol: String,
    /// Rewarded quantity.
    pub quantity: Decimal,
    /// Latest price at processing time.
    pub price: Decimal,
    /// Itemized fees.
    pub fees: FeeBreakdownDto,
    /// Rounded fee total.
    pub total_fees: Decimal,
    /// Transaction value plus fees.
    pub total_cost: Decimal,
}

impl From<RewardReceipt> for RewardReceiptDto {
    fn from(receipt: RewardReceipt) -> Self {
        Self {
            reward_id: receipt.reward_id,
            user_id: receipt.user_id.into(),
            stock_symbol: receipt.symbol.into(),
            quantity: receipt.quantity,
            price: receipt.price,
            fees: receipt.fees.into(),
            total_fees: receipt.total_fees,
            total_cost: receipt.total_cost,
        }
    }
}

/// Unrounded fee components.
#[derive(Debug, Serialize, ToSchema)]
pub struct FeeBreakdownDto {
    /// `price × quantity`.
    pub transaction_value: Decimal,
    /// Brokerage after the minimum is applied.
    pub brokerage: Decimal,
    /// Securities transaction tax.
    pub stt: Decimal,
    /// GST on brokerage.
    pub gst: Decimal,
    /// Exchange transaction charges.
    pub exchange_charges: Decimal,
    /// SEBI turnover fee.
    pub sebi_charges: Decimal,
    /// Stamp duty.
    pub stamp_duty: Decimal,
}

impl From<FeeBreakdown> for FeeBreakdownDto {
    fn from(fees: FeeBreakdown) -> Self {
        Self {
            transaction_value: fees.transaction_value,
            brokerage: fees.brokerage,
            stt: fees.securities_transaction_tax,
            gst: fees.goods_and_services_tax,
            exchange_charges: fees.exchange_charges,
            sebi_charges: fees.regulatory_charges,
            stamp_duty: fees.stamp_duty,
        }
    }
}

/// One ledger line for `GET /ledger/{event_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerEntryDto {
    /// Line identity.
    pub id: Uuid,
    /// Owning reward event.
    pub event_id: Uuid,
    /// `STOCK`, `CASH` or `FEE`.
    #[schema(example = "STOCK")]
    pub entry_type: String,
    /// Present only on `STOCK` lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_symbol: Option<String>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Line creation time.
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerEntryDto {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            event_id: entry.event_id.into(),
            entry_type: entry.account.kind().as_str().to_string(),
            stock_symbol: entry.account.symbol().map(|s| s.as_str().to_string()),
            debit: entry.debit,
            credit: entry.credit,
            created_at: entry.created_at,
        }
    }
}

/// Response body for `GET /ledger/balance`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerBalanceResponse {
    /// Sum of all debits.
    pub total_debit: Decimal,
    /// Sum of all credits.
    pub total_credit: Decimal,
    /// `true` when the two sums are equal.
    pub balanced: bool,
}

impl From<LedgerTotals> for LedgerBalanceResponse {
    fn from(totals: LedgerTotals) -> Self {
        Self {
            total_debit: totals.debit,
            total_credit: totals.credit,
            balanced: totals.is_balanced(),
        }
    }
}
