//! Double-entry ledger lines for reward events.
//!
//! Every applied reward produces exactly one [`LedgerBatch`] of three
//! entries whose debits and credits sum to the same amount:
//!
//! | Account | Debit                 | Credit          |
//! |---------|-----------------------|-----------------|
//! | STOCK   | 0                     | price × qty     |
//! | CASH    | price × qty + fees    | 0               |
//! | FEE     | 0                     | fees            |

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{EventId, RewardEvent, Symbol};
use crate::error::LedgerError;

/// Flat discriminator of a ledger line, as stored and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryKind {
    /// Shares of a stock.
    Stock,
    /// Cash outlay.
    Cash,
    /// Brokerage and regulatory fees.
    Fee,
}

impl EntryKind {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "STOCK",
            Self::Cash => "CASH",
            Self::Fee => "FEE",
        }
    }

    /// Parses the storage representation.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Internal`] for an unknown kind.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        match raw {
            "STOCK" => Ok(Self::Stock),
            "CASH" => Ok(Self::Cash),
            "FEE" => Ok(Self::Fee),
            other => Err(LedgerError::Internal(format!("unknown ledger entry kind {other}"))),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account a ledger line posts to. Only stock lines carry a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerAccount {
    /// Holding of the given stock.
    Stock(Symbol),
    /// Cash.
    Cash,
    /// Fees.
    Fee,
}

impl LedgerAccount {
    /// Flat kind of this account.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::Stock(_) => EntryKind::Stock,
            Self::Cash => EntryKind::Cash,
            Self::Fee => EntryKind::Fee,
        }
    }

    /// Symbol of a stock account, `None` otherwise.
    #[must_use]
    pub const fn symbol(&self) -> Option<&Symbol> {
        match self {
            Self::Stock(symbol) => Some(symbol),
            Self::Cash | Self::Fee => None,
        }
    }

    /// Rebuilds an account from its stored `(kind, symbol)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Internal`] if the kind is unknown, a stock
    /// line has no symbol, or a non-stock line has one.
    pub fn from_parts(kind: &str, symbol: Option<&str>) -> Result<Self, LedgerError> {
        match (EntryKind::parse(kind)?, symbol) {
            (EntryKind::Stock, Some(raw)) => Symbol::parse(raw)
                .map(Self::Stock)
                .map_err(|e| LedgerError::Internal(format!("stored ledger symbol: {e}"))),
            (EntryKind::Cash, None) => Ok(Self::Cash),
            (EntryKind::Fee, None) => Ok(Self::Fee),
            (kind, symbol) => Err(LedgerError::Internal(format!(
                "inconsistent ledger entry: kind={kind}, symbol={symbol:?}"
            ))),
        }
    }
}

/// One immutable accounting line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Row identity.
    pub id: uuid::Uuid,
    /// Reward event this line belongs to.
    pub event_id: EventId,
    /// Account posted to.
    pub account: LedgerAccount,
    /// Debit amount, non-negative.
    pub debit: Decimal,
    /// Credit amount, non-negative.
    pub credit: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// New debit line.
    #[must_use]
    pub fn debit(event_id: EventId, account: LedgerAccount, amount: Decimal) -> Self {
        Self::new(event_id, account, amount, Decimal::ZERO)
    }

    /// New credit line.
    #[must_use]
    pub fn credit(event_id: EventId, account: LedgerAccount, amount: Decimal) -> Self {
        Self::new(event_id, account, Decimal::ZERO, amount)
    }

    fn new(event_id: EventId, account: LedgerAccount, debit: Decimal, credit: Decimal) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            event_id,
            account,
            debit,
            credit,
            created_at: Utc::now(),
        }
    }
}

/// Debit and credit sums over a set of ledger lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerTotals {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

impl LedgerTotals {
    /// Sums the given entries.
    #[must_use]
    pub fn of<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        entries.into_iter().fold(Self::default(), |acc, entry| Self {
            debit: acc.debit + entry.debit,
            credit: acc.credit + entry.credit,
        })
    }

    /// `true` when debits equal credits.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }

    /// Converts an imbalance into [`LedgerError::LedgerImbalance`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::LedgerImbalance`] if debits and credits differ.
    pub fn ensure_balanced(&self) -> Result<(), LedgerError> {
        if self.is_balanced() {
            Ok(())
        } else {
            Err(LedgerError::LedgerImbalance {
                debit: self.debit,
                credit: self.credit,
            })
        }
    }
}

/// The three balanced ledger lines of one reward event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerBatch {
    entries: [LedgerEntry; 3],
}

impl LedgerBatch {
    /// Builds the stock, cash and fee lines for `reward` priced at `price`
    /// with `fees` already rounded.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if the amounts do not fit in a
    /// [`Decimal`], or [`LedgerError::LedgerImbalance`] if the lines do not
    /// balance.
    pub fn for_reward(
        reward: &RewardEvent,
        price: Decimal,
        fees: Decimal,
    ) -> Result<Self, LedgerError> {
        let out_of_range = || {
            LedgerError::Validation(format!(
                "ledger amounts for event {} are out of range",
                reward.event_id
            ))
        };
        let value = price.checked_mul(reward.quantity).ok_or_else(out_of_range)?;
        let cash = value.checked_add(fees).ok_or_else(out_of_range)?;
        Self::from_entries([
            LedgerEntry::credit(
                reward.event_id,
                LedgerAccount::Stock(reward.symbol.clone()),
                value,
            ),
            LedgerEntry::debit(reward.event_id, LedgerAccount::Cash, cash),
            LedgerEntry::credit(reward.event_id, LedgerAccount::Fee, fees),
        ])
    }

    /// Wraps three lines, verifying that they balance, belong to a single
    /// event, and carry no negative amounts.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::LedgerImbalance`] if debits and credits differ,
    /// or [`LedgerError::Internal`] if the lines are otherwise malformed.
    pub fn from_entries(entries: [LedgerEntry; 3]) -> Result<Self, LedgerError> {
        let [first, rest @ ..] = &entries;
        if rest.iter().any(|entry| entry.event_id != first.event_id) {
            return Err(LedgerError::Internal(
                "ledger batch spans multiple events".to_string(),
            ));
        }
        if entries
            .iter()
            .any(|entry| entry.debit < Decimal::ZERO || entry.credit < Decimal::ZERO)
        {
            return Err(LedgerError::Internal(
                "ledger batch contains a negative amount".to_string(),
            ));
        }
        LedgerTotals::of(&entries).ensure_balanced()?;
        Ok(Self { entries })
    }

    /// Event the batch belongs to.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        let [first, ..] = &self.entries;
        first.event_id
    }

    /// The lines, in stock, cash, fee order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Debit and credit sums of the batch.
    #[must_use]
    pub fn totals(&self) -> LedgerTotals {
        LedgerTotals::of(&self.entries)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{RewardRequest, UserId};
    use rust_decimal_macros::dec;

    fn reward(quantity: Decimal) -> RewardEvent {
        let Ok(symbol) = Symbol::parse("RELIANCE") else {
            panic!("valid symbol");
        };
        let Ok(request) =
            RewardRequest::new(UserId::new(), symbol, quantity, Utc::now(), EventId::new())
        else {
            panic!("valid request");
        };
        RewardEvent::from_request(&request)
    }

    #[test]
    fn reward_batch_balances() {
        let reward = reward(dec!(1.5));
        let Ok(batch) = LedgerBatch::for_reward(&reward, dec!(2500), dec!(24.54)) else {
            panic!("expected balanced batch");
        };
        let totals = batch.totals();
        assert!(totals.is_balanced());
        assert_eq!(totals.debit, dec!(3774.54));
        assert_eq!(batch.event_id(), reward.event_id);

        let kinds: Vec<EntryKind> = batch.entries().iter().map(|e| e.account.kind()).collect();
        assert_eq!(kinds, vec![EntryKind::Stock, EntryKind::Cash, EntryKind::Fee]);
    }

    #[test]
    fn out_of_range_amounts_are_rejected() {
        let huge = reward(Decimal::MAX / dec!(10));
        assert!(matches!(
            LedgerBatch::for_reward(&huge, dec!(3500), dec!(20)),
            Err(LedgerError::Validation(_))
        ));
        // The value fits but adding the fees to the cash line does not.
        let max = reward(Decimal::MAX);
        assert!(matches!(
            LedgerBatch::for_reward(&max, Decimal::ONE, dec!(1)),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn only_stock_line_has_symbol() {
        let reward = reward(dec!(2));
        let Ok(batch) = LedgerBatch::for_reward(&reward, dec!(100), dec!(23.61)) else {
            panic!("expected balanced batch");
        };
        for entry in batch.entries() {
            assert_eq!(
                entry.account.symbol().is_some(),
                entry.account.kind() == EntryKind::Stock
            );
        }
    }

    #[test]
    fn unbalanced_lines_are_rejected() {
        let event_id = EventId::new();
        let Ok(symbol) = Symbol::parse("TCS") else {
            panic!("valid symbol");
        };
        // Fee posted on the debit side double counts it.
        let result = LedgerBatch::from_entries([
            LedgerEntry::credit(event_id, LedgerAccount::Stock(symbol), dec!(1000)),
            LedgerEntry::debit(event_id, LedgerAccount::Cash, dec!(1023.91)),
            LedgerEntry::debit(event_id, LedgerAccount::Fee, dec!(23.91)),
        ]);
        let Err(LedgerError::LedgerImbalance { debit, credit }) = result else {
            panic!("expected imbalance");
        };
        assert_eq!(debit, dec!(1047.82));
        assert_eq!(credit, dec!(1000));
    }

    #[test]
    fn mixed_events_are_rejected() {
        let result = LedgerBatch::from_entries([
            LedgerEntry::debit(EventId::new(), LedgerAccount::Cash, dec!(1)),
            LedgerEntry::credit(EventId::new(), LedgerAccount::Fee, dec!(1)),
            LedgerEntry::credit(EventId::new(), LedgerAccount::Fee, dec!(0)),
        ]);
        assert!(matches!(result, Err(LedgerError::Internal(_))));
    }

    #[test]
    fn account_from_parts_enforces_symbol_rule() {
        assert!(matches!(
            LedgerAccount::from_parts("STOCK", Some("tcs")),
            Ok(LedgerAccount::Stock(_))
        ));
        assert_eq!(LedgerAccount::from_parts("CASH", None).ok(), Some(LedgerAccount::Cash));
        assert!(LedgerAccount::from_parts("STOCK", None).is_err());
        assert!(LedgerAccount::from_parts("FEE", Some("TCS")).is_err());
        assert!(LedgerAccount::from_parts("BOND", None).is_err());
    }
}
