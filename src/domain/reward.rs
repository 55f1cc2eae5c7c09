//! Reward events, the validated reward command, and users.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{EventId, Symbol, UserId};
use crate::error::LedgerError;

/// Validated request to grant `quantity` shares of `symbol` to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardRequest {
    /// Rewarded user.
    pub user_id: UserId,
    /// Rewarded stock.
    pub symbol: Symbol,
    /// Number of shares, strictly positive, may be fractional.
    pub quantity: Decimal,
    /// When the reward happened upstream.
    pub timestamp: DateTime<Utc>,
    /// Idempotency key.
    pub event_id: EventId,
}

impl RewardRequest {
    /// Builds a request, rejecting non-positive quantities.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if `quantity <= 0`.
    pub fn new(
        user_id: UserId,
        symbol: Symbol,
        quantity: Decimal,
        timestamp: DateTime<Utc>,
        event_id: EventId,
    ) -> Result<Self, LedgerError> {
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "quantity must be greater than zero, got {quantity}"
            )));
        }
        Ok(Self {
            user_id,
            symbol,
            quantity,
            timestamp,
            event_id,
        })
    }
}

/// Immutable record of one applied reward. Created once per [`EventId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardEvent {
    /// Row identity.
    pub id: uuid::Uuid,
    /// Idempotency key, unique across all rewards.
    pub event_id: EventId,
    /// Owning user.
    pub user_id: UserId,
    /// Rewarded stock.
    pub symbol: Symbol,
    /// Number of shares.
    pub quantity: Decimal,
    /// Upstream event time.
    pub timestamp: DateTime<Utc>,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
}

impl RewardEvent {
    /// Creates the record for a validated request.
    #[must_use]
    pub fn from_request(request: &RewardRequest) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            event_id: request.event_id,
            user_id: request.user_id,
            symbol: request.symbol.clone(),
            quantity: request.quantity,
            timestamp: request.timestamp,
            created_at: Utc::now(),
        }
    }
}

/// A user, created lazily on first reward and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// User identity.
    pub id: UserId,
    /// First time the user was seen.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn symbol() -> Symbol {
        let Ok(symbol) = Symbol::parse("TCS") else {
            panic!("valid symbol");
        };
        symbol
    }

    #[test]
    fn rejects_zero_and_negative_quantity() {
        for qty in [Decimal::ZERO, dec!(-1.5)] {
            let result = RewardRequest::new(UserId::new(), symbol(), qty, Utc::now(), EventId::new());
            assert!(matches!(result, Err(LedgerError::Validation(_))));
        }
    }

    #[test]
    fn event_copies_request_fields() {
        let Ok(request) =
            RewardRequest::new(UserId::new(), symbol(), dec!(0.25), Utc::now(), EventId::new())
        else {
            panic!("valid request");
        };
        let event = RewardEvent::from_request(&request);
        assert_eq!(event.event_id, request.event_id);
        assert_eq!(event.user_id, request.user_id);
        assert_eq!(event.quantity, dec!(0.25));
        assert_eq!(event.timestamp, request.timestamp);
    }
}
