//! Domain layer: identifiers, reward and ledger records, fees, and the
//! reporting calendar.
//!
//! Everything here is pure: no I/O, no clocks other than record creation
//! timestamps. All monetary math uses [`rust_decimal::Decimal`].

pub mod fees;
pub mod ids;
pub mod ledger;
pub mod money;
pub mod price;
pub mod reporting_time;
pub mod reward;
pub mod symbol;

pub use fees::{FeeBreakdown, calculate_fees};
pub use ids::{EventId, UserId};
pub use ledger::{EntryKind, LedgerAccount, LedgerBatch, LedgerEntry, LedgerTotals};
pub use money::round_money;
pub use price::StockPriceSnapshot;
pub use reporting_time::DayWindow;
pub use reward::{RewardEvent, RewardRequest, User};
pub use symbol::Symbol;
